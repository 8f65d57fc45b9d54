//! Page rendering: compression blocks and image cache tags.
//!
//! A page marks the assets to bundle with comment pairs:
//!
//! ```html
//! <!-- decant:css -->
//! <link rel="stylesheet" href="/css/site.css">
//! <style>.note { color: gray }</style>
//! <!-- /decant:css -->
//! ```
//!
//! With compression on, each block is replaced by the tags its pipeline
//! emits. Otherwise the markers are dropped and the block is kept as written.

use std::fmt;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use crate::asset::{self, BasePaths, add_image_cache_tags};
use crate::log;

static RE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*decant:(css|js)\s*-->(.*?)<!--\s*/decant:(css|js)\s*-->").unwrap()
});

/// Everything a page needs to be rendered.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub paths: BasePaths,
    pub compress: bool,
    /// URL substrings never cache-tagged (icons with fixed names).
    pub cache_tag_exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Css,
    Js,
}

impl BlockKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "css" => Some(Self::Css),
            "js" => Some(Self::Js),
            _ => None,
        }
    }

    fn compress(self, block: &str, paths: &BasePaths) -> asset::Result<String> {
        match self {
            Self::Css => asset::compress_css(block, paths),
            Self::Js => asset::compress_js(block, paths),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Css => "css",
            Self::Js => "js",
        })
    }
}

/// Render one HTML page.
///
/// `page` is the page's path relative to `base_root`; it is both the name
/// used in errors and the referrer for relative image URLs.
pub fn render_page(html: &str, page: &str, ctx: &PageContext) -> Result<String> {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for caps in RE_BLOCK.captures_iter(html) {
        let (Some(whole), Some(open), Some(body), Some(close)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let (Some(kind), Some(close_kind)) =
            (BlockKind::parse(open.as_str()), BlockKind::parse(close.as_str()))
        else {
            continue;
        };
        if kind != close_kind {
            bail!("`{page}`: block opened as `{kind}` but closed as `{close_kind}`");
        }

        out.push_str(&html[last..whole.start()]);
        let block = body.as_str().trim();
        if ctx.compress {
            out.push_str(&compress_block(kind, block, page, &ctx.paths)?);
        } else {
            out.push_str(block);
        }
        last = whole.end();
    }
    out.push_str(&html[last..]);

    if ctx.compress {
        out = add_image_cache_tags(&out, &ctx.paths, page, &ctx.cache_tag_exclude);
    }
    Ok(out)
}

fn compress_block(kind: BlockKind, block: &str, page: &str, paths: &BasePaths) -> Result<String> {
    match kind.compress(block, paths) {
        Ok(tags) => Ok(tags),
        Err(e) => {
            let e = anyhow::Error::new(e);
            log!("error"; "{}: {:#}", page, e);
            Err(e.context(format!("failed to compress {kind} block in `{page}`")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetError;
    use crate::asset::hash::hash_content;
    use std::fs;
    use tempfile::TempDir;

    fn site(compress: bool) -> (TempDir, PageContext) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("www");
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("img")).unwrap();
        fs::write(root.join("css/site.css"), "p { margin: 0; }").unwrap();
        fs::write(root.join("img/photo.jpg"), b"jpeg bytes").unwrap();
        fs::write(root.join("img/favicon.png"), b"icon").unwrap();
        let ctx = PageContext {
            paths: BasePaths::new("/", &root, dir.path().join("public"), "assets"),
            compress,
            cache_tag_exclude: vec!["favicon".into()],
        };
        (dir, ctx)
    }

    const PAGE: &str = "<html><head>\n<!-- decant:css -->\n  <link rel=\"stylesheet\" href=\"/css/site.css\">\n<!-- /decant:css -->\n<link rel=\"icon\" href=\"/img/favicon.png\">\n</head><body><img src=\"img/photo.jpg\">\n<!--decant:js--><script>var x = 1;</script><!--/decant:js-->\n</body></html>";

    #[test]
    fn test_render_page_without_compression() {
        let (_dir, ctx) = site(false);
        let out = render_page(PAGE, "index.html", &ctx).unwrap();

        assert!(!out.contains("decant:"));
        assert!(out.contains("<head>\n<link rel=\"stylesheet\" href=\"/css/site.css\">\n<link rel=\"icon\""));
        assert!(out.contains("<script>var x = 1;</script>"));
        assert!(out.contains("<img src=\"img/photo.jpg\">"));
        assert!(!ctx.paths.assets_root().exists());
    }

    #[test]
    fn test_render_page_with_compression() {
        let (_dir, ctx) = site(true);
        let out = render_page(PAGE, "index.html", &ctx).unwrap();

        assert!(!out.contains("decant:"));
        assert!(!out.contains("/css/site.css"));
        assert!(out.contains("<link rel=\"stylesheet\" href=\"/assets/"));
        assert!(out.contains("<script src=\"/assets/"));
        assert!(!out.contains("var x"));
        // Images are tagged relative to the page, icons are excluded
        let photo = hash_content(b"jpeg bytes".as_slice());
        assert!(out.contains(&format!("<img src=\"img/photo.{photo}.jpg\">")));
        assert!(out.contains("<link rel=\"icon\" href=\"/img/favicon.png\">"));
    }

    #[test]
    fn test_render_page_propagates_asset_errors() {
        let (_dir, ctx) = site(true);
        let html = "<!-- decant:css --><link rel=\"stylesheet\" href=\"/css/gone.css\"><!-- /decant:css -->";
        let err = render_page(html, "about/index.html", &ctx).unwrap_err();

        assert!(err.to_string().contains("about/index.html"));
        assert!(matches!(
            err.downcast_ref::<AssetError>(),
            Some(AssetError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_render_page_mismatched_markers() {
        let (_dir, ctx) = site(false);
        let html = "<!-- decant:css --><style>p{}</style><!-- /decant:js -->";
        assert!(render_page(html, "index.html", &ctx).is_err());
    }

    #[test]
    fn test_render_page_plain_html_untouched() {
        let (_dir, ctx) = site(true);
        let html = "<!doctype html>\n<p>Hello <!-- note --> world</p>\n";
        assert_eq!(render_page(html, "index.html", &ctx).unwrap(), html);
    }
}
