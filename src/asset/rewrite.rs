//! Cache-tagging of asset references.
//!
//! A reference to a local file gets the file's content hash spliced in
//! before its extension (`/img/logo.png` → `/img/logo.0123456789ab.png`), so
//! any change to the file changes every URL pointing at it.
//!
//! Two call sites use this:
//! - stylesheet text, once per input file before concatenation
//!   ([`rewrite_css_references`])
//! - a fully rendered page, for `<img>`/`<a>` attributes
//!   ([`add_image_cache_tags`])

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::hash::{hash_file, is_cache_bustable, is_cache_tag};
use super::paths::{BasePaths, extract_filename};
use crate::debug;
use crate::utils::path::{is_external_link, normalize_url_path, split_url, url_dirname};

/// `url(...)` in any of its three quoting forms.
static RE_CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:'([^']*)'|"([^"]*)"|([^)'"\s]*))\s*\)"#).unwrap()
});

/// `src='...'` / `src="..."` (legacy IE filters, `@font-face` variants).
static RE_CSS_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src=(?:'([^']+)'|"([^"]+)")"#).unwrap());

static RE_HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(img|a)\b[^>]*>").unwrap());

/// Double-quoted, single-quoted or unquoted `src` value.
static RE_SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

static RE_HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\shref\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Inline fallback idiom: `onerror="this.onerror=null; this.src='x.png'"`.
static RE_ONERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"this\.onerror=null;\s*this\.src='([^']+\.(?:png|gif|jpe?g))'").unwrap()
});

static RE_IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:jpe?g|gif|png|svg|webp)$").unwrap());

/// Syntactic classification of an asset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// In-document anchor (`#section`).
    Fragment,
    /// Inline payload (`data:image/png;base64,...`).
    Data,
    /// Has a scheme or is protocol-relative (`https://`, `//cdn`).
    External,
    /// Rooted at the site (`/img/a.png`).
    SiteRoot,
    /// Relative to the referring document (`../img/a.png`).
    Relative,
}

impl ReferenceKind {
    #[inline]
    pub fn parse(url: &str) -> Self {
        if url.starts_with('#') {
            Self::Fragment
        } else if url.starts_with("data:") {
            Self::Data
        } else if is_external_link(url) {
            Self::External
        } else if url.starts_with('/') {
            Self::SiteRoot
        } else {
            Self::Relative
        }
    }

    /// Whether a reference of this kind can point at a local file.
    #[inline]
    pub const fn is_local(self) -> bool {
        matches!(self, Self::SiteRoot | Self::Relative)
    }
}

/// Rewrite `url` to carry the content hash of the file it refers to.
///
/// `referrer` is the `base_root`-relative path of the referring document.
/// Anything that cannot be resolved to a local file comes back unchanged, as
/// does a file type the build does not publish under a tagged name.
pub fn add_cache_tag(url: &str, paths: &BasePaths, referrer: &str) -> String {
    if !ReferenceKind::parse(url).is_local() {
        return url.to_string();
    }

    let (path, query, fragment) = split_url(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    if is_tagged(segment) || !is_cache_bustable(path) {
        return url.to_string();
    }

    let Some(file) = extract_filename(url, paths, referrer) else {
        return url.to_string();
    };
    let tag = match hash_file(&file) {
        Ok(tag) => tag,
        Err(e) => {
            debug!("cache"; "cannot hash {}: {}", file.display(), e);
            return url.to_string();
        }
    };

    match splice_tag(path, &tag) {
        Some(tagged) => format!("{tagged}{query}{fragment}"),
        None => url.to_string(),
    }
}

/// Insert `.tag` before the extension of the last path segment.
fn splice_tag(path: &str, tag: &str) -> Option<String> {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let dot = path[name_start..].rfind('.').filter(|&i| i > 0)? + name_start;
    Some(format!("{}.{}{}", &path[..dot], tag, &path[dot..]))
}

/// `name.<tag>.ext`
fn is_tagged(segment: &str) -> bool {
    let mut parts = segment.rsplitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(tag), Some(stem)) => !stem.is_empty() && is_cache_tag(tag),
        _ => false,
    }
}

/// Cache-tag every `url(...)` and `src=` reference in one stylesheet.
///
/// `basename` is the stylesheet's path relative to `base_url`. Relative
/// references are made absolute first, since the concatenated output is
/// served from a different directory.
pub fn rewrite_css_references(css: &str, paths: &BasePaths, basename: &str) -> String {
    let css = RE_CSS_URL.replace_all(css, |caps: &Captures| {
        let url = first_group(caps, &[1, 2, 3]);
        match css_reference(url, paths, basename) {
            Some(url) => format!("url({})", quote(&url)),
            None => caps[0].to_string(),
        }
    });

    RE_CSS_SRC
        .replace_all(&css, |caps: &Captures| {
            let url = first_group(caps, &[1, 2]);
            match css_reference(url, paths, basename) {
                Some(url) => format!("src={}", quote(&url)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn css_reference(url: &str, paths: &BasePaths, basename: &str) -> Option<String> {
    let url = url.trim();
    match ReferenceKind::parse(url) {
        _ if url.is_empty() => None,
        ReferenceKind::Fragment | ReferenceKind::Data | ReferenceKind::External => None,
        ReferenceKind::SiteRoot => Some(add_cache_tag(url, paths, basename)),
        ReferenceKind::Relative => {
            let (path, query, fragment) = split_url(url);
            let absolute = match url_dirname(basename) {
                "" => normalize_url_path(&format!("{}{path}", paths.base_url)),
                dir => normalize_url_path(&format!("{}{dir}/{path}", paths.base_url)),
            };
            let absolute = format!("{absolute}{query}{fragment}");
            Some(add_cache_tag(&absolute, paths, basename))
        }
    }
}

fn first_group<'h>(caps: &Captures<'h>, groups: &[usize]) -> &'h str {
    groups
        .iter()
        .find_map(|&i| caps.get(i))
        .map_or("", |m| m.as_str())
}

fn quote(url: &str) -> String {
    if url.contains('\'') {
        format!("\"{url}\"")
    } else {
        format!("'{url}'")
    }
}

/// Cache-tag image references in a rendered page.
///
/// Rewrites `<img src>`, `<a href>` pointing at a local image, and the
/// fallback URL of the `this.onerror=null; this.src='...'` idiom. URLs
/// containing any of `excludes` are left alone. Only attribute values
/// change; every other byte of `html` is preserved.
pub fn add_image_cache_tags(
    html: &str,
    paths: &BasePaths,
    page: &str,
    excludes: &[String],
) -> String {
    let tag_image = |url: &str, require_local: bool| -> Option<String> {
        let (path, _, _) = split_url(url);
        if !RE_IMAGE_EXT.is_match(path) || excludes.iter().any(|e| url.contains(e.as_str())) {
            return None;
        }
        if require_local && !url.starts_with(paths.base_url.as_str()) {
            return None;
        }
        Some(add_cache_tag(url, paths, page))
    };

    let html = RE_HTML_TAG.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        let is_img = caps[1].eq_ignore_ascii_case("img");
        let attr = if is_img { &*RE_SRC_ATTR } else { &*RE_HREF_ATTR };
        rewrite_attr(tag, attr, |url| tag_image(url, !is_img)).into_owned()
    });

    RE_ONERROR
        .replace_all(&html, |caps: &Captures| {
            let url = &caps[1];
            match tag_image(url, false) {
                Some(tagged) => caps[0].replacen(url, &tagged, 1),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Replace the first value of an attribute inside a single start tag.
fn rewrite_attr<'t>(
    tag: &'t str,
    attr: &Regex,
    rewrite: impl Fn(&str) -> Option<String>,
) -> Cow<'t, str> {
    let Some(caps) = attr.captures(tag) else {
        return Cow::Borrowed(tag);
    };
    let Some(value) = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)) else {
        return Cow::Borrowed(tag);
    };
    match rewrite(value.as_str()) {
        Some(new) if new != value.as_str() => {
            let mut out = String::with_capacity(tag.len() + new.len());
            out.push_str(&tag[..value.start()]);
            out.push_str(&new);
            out.push_str(&tag[value.end()..]);
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(tag),
    }
}
