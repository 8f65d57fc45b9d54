//! Mapping between public URLs and filesystem paths.
//!
//! ```text
//! base_url  = /site/                     base_root   = /srv/www
//! /site/css/main.css?v=3   ─basename→    css/main.css ─filename→ /srv/www/css/main.css
//!
//! output_root = /srv/public              assets_dir  = assets
//! /srv/public/assets/0123456789ab.css  ─cache_url→  /site/assets/0123456789ab.css
//! ```

use std::path::{Path, PathBuf};

use super::error::{AssetError, Result};
use crate::utils::path::{join_under_root, split_url, to_slash, url_dirname};

/// The directories and URL prefix every asset operation is relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePaths {
    /// Public URL prefix, always `/`-delimited on both ends (`/`, `/site/`).
    pub base_url: String,
    /// Directory served at `base_url`.
    pub base_root: PathBuf,
    /// Build output directory.
    pub output_root: PathBuf,
    /// Cache directory, relative to `output_root`.
    pub assets_dir: PathBuf,
}

impl BasePaths {
    pub fn new(
        base_url: &str,
        base_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            base_root: base_root.into(),
            output_root: output_root.into(),
            assets_dir: assets_dir.into(),
        }
    }

    /// Absolute directory holding content-addressed cache files.
    pub fn assets_root(&self) -> PathBuf {
        self.output_root.join(&self.assets_dir)
    }

    /// Public URL of a file written under `output_root`.
    ///
    /// Paths outside `output_root` fall back to their file name under
    /// `base_url`.
    pub fn cache_url(&self, path: &Path) -> String {
        let relative = match path.strip_prefix(&self.output_root) {
            Ok(rel) => to_slash(rel),
            Err(_) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        format!("{}{}", self.base_url, relative.trim_start_matches('/'))
    }
}

/// Normalize a URL prefix to exactly one leading and trailing `/`, with no
/// empty segments.
///
/// `""` → `/`, `site` → `/site/`, `//a//b/` → `/a/b/`.
pub fn normalize_base_url(url: &str) -> String {
    let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Strip `base_url` and any querystring from a declared asset URL.
///
/// Fails with [`AssetError::NotAccessible`] when the URL is not served under
/// `base_url`, since such an asset cannot be read from `base_root`.
pub fn resolve_basename(url: &str, base_url: &str) -> Result<String> {
    let Some(rest) = url.strip_prefix(base_url) else {
        return Err(AssetError::NotAccessible {
            url: url.to_string(),
            base_url: base_url.to_string(),
        });
    };
    let basename = rest.split_once('?').map_or(rest, |(path, _)| path);
    Ok(basename.to_string())
}

/// Join a basename under `base_root`, requiring the file to exist.
pub fn resolve_filename(basename: &str, base_root: &Path) -> Result<PathBuf> {
    let not_found = |path: PathBuf| AssetError::FileNotFound {
        url: basename.to_string(),
        path,
    };

    let Some(path) = join_under_root(base_root, basename) else {
        return Err(not_found(base_root.join(basename.trim_start_matches('/'))));
    };
    if path.exists() {
        Ok(path)
    } else {
        Err(not_found(path))
    }
}

/// Resolve a declared asset URL to `(basename, filename)`.
pub fn resolve_declared(url: &str, paths: &BasePaths) -> Result<(String, PathBuf)> {
    let basename = resolve_basename(url, &paths.base_url)?;
    let filename = resolve_filename(&basename, &paths.base_root)?;
    Ok((basename, filename))
}

/// Find the file a URL nested inside already-accepted content refers to.
///
/// `referrer` is the `base_root`-relative path of the document containing
/// the reference. Returns `None` when the URL does not map to an existing
/// file; callers leave such URLs untouched.
pub fn extract_filename(url: &str, paths: &BasePaths, referrer: &str) -> Option<PathBuf> {
    let (path, _, _) = split_url(url);
    if path.is_empty() {
        return None;
    }

    let relative = if let Some(rest) = path.strip_prefix(paths.base_url.as_str()) {
        rest.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        match url_dirname(referrer) {
            "" => path.to_string(),
            dir => format!("{dir}/{path}"),
        }
    };

    let filename = join_under_root(&paths.base_root, &relative)?;
    filename.is_file().then_some(filename)
}
