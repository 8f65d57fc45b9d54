//! CSS and JS compression pipelines.
//!
//! ```text
//! markup ─scan→ fragments ─group→ media groups ─read/rewrite→ joined text
//!        ─minify→ content ─hash→ <assets>/<tag>.css ─write_if_absent→ <link>
//! ```
//!
//! JS skips the grouping step and always produces a single `<script>`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::error::Result;
use super::group::{AssetUnit, collect_css_units, group_by_media};
use super::hash::cache_path;
use super::minify::{minify_css, minify_js};
use super::paths::BasePaths;
use super::rewrite::rewrite_css_references;
use super::scan::{FragmentKind, scan_fragments};
use super::store::write_if_absent;
use crate::debug;
use crate::utils::html::escape_attr;

static RE_USE_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]use strict['"];?"#).unwrap());

/// Compress every stylesheet in `block` into cached files.
///
/// Returns one `<link rel="stylesheet">` per media group, newline-separated,
/// or an empty string when the block holds no stylesheets.
pub fn compress_css(block: &str, paths: &BasePaths) -> Result<String> {
    let fragments = scan_fragments(block, FragmentKind::CSS);
    let groups = group_by_media(collect_css_units(&fragments, paths)?);

    let mut tags = Vec::with_capacity(groups.len());
    for group in groups {
        let mut joined = String::new();
        for unit in &group.units {
            let text = unit.read()?;
            let text = match unit.basename() {
                Some(basename) => Cow::Owned(rewrite_css_references(&text, paths, basename)),
                None => Cow::Borrowed(text.as_str()),
            };
            push_unit(&mut joined, &text, "\n");
        }

        let content = minify_css(&joined).unwrap_or_else(|| {
            debug!("css"; "minifier rejected input, keeping unminified text");
            joined
        });
        let url = store(&content, paths, "css")?;

        let tag = match &group.media {
            Some(media) => format!(
                r#"<link rel="stylesheet" href="{}" media="{}">"#,
                escape_attr(&url),
                escape_attr(media)
            ),
            None => format!(r#"<link rel="stylesheet" href="{}">"#, escape_attr(&url)),
        };
        tags.push(tag);
    }

    Ok(tags.join("\n"))
}

/// Compress every script in `block` into one cached file.
///
/// Returns a single `<script src>` tag, or an empty string when the block
/// holds no scripts.
pub fn compress_js(block: &str, paths: &BasePaths) -> Result<String> {
    let fragments = scan_fragments(block, FragmentKind::JS);
    if fragments.is_empty() {
        return Ok(String::new());
    }

    let mut joined = String::new();
    for fragment in &fragments {
        let unit = match fragment.attr("src") {
            Some(src) => AssetUnit::from_url(src, None, paths)?,
            None => AssetUnit::inline(fragment.inline_text.as_deref(), None),
        };
        let text = unit.read()?;
        push_unit(&mut joined, &strip_use_strict(&text), ";\n");
    }

    let content = minify_js(&joined).unwrap_or_else(|| {
        debug!("js"; "minifier rejected input, keeping unminified text");
        joined
    });
    let url = store(&content, paths, "js")?;

    Ok(format!(r#"<script src="{}"></script>"#, escape_attr(&url)))
}

/// Remove `"use strict";` directives so one file's strict mode does not
/// leak into the files concatenated after it.
pub fn strip_use_strict(source: &str) -> Cow<'_, str> {
    RE_USE_STRICT.replace_all(source, "")
}

fn push_unit(joined: &mut String, text: &str, separator: &str) {
    if !joined.is_empty() {
        joined.push_str(separator);
    }
    joined.push_str(text);
}

/// Write content to its cache path and return the public URL.
fn store(content: &str, paths: &BasePaths, extension: &str) -> Result<String> {
    let path = cache_path(content, &paths.assets_root(), extension);
    if write_if_absent(&path, content.as_bytes())? {
        debug!("cache"; "wrote {}", path.display());
    }
    Ok(paths.cache_url(&path))
}
