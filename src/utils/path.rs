//! Path and URL utilities.
//!
//! Pure functions for URL path manipulation, plus a couple of small
//! filesystem helpers used by the site build.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Check if a link is external (has a URL scheme like `https:`, `mailto:`)
/// or is protocol-relative (`//cdn.example.com/...`).
///
/// A valid scheme must have at least 1 character before the colon and only
/// contain ASCII alphanumeric or `+`, `-`, `.`.
#[inline]
pub fn is_external_link(link: &str) -> bool {
    link.starts_with("//")
        || link.find(':').is_some_and(|pos| {
            pos > 0
                && link[..pos]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
}

/// Split a URL into `(path, query, fragment)`.
///
/// The query includes its leading `?` and the fragment its leading `#`,
/// so `path + query + fragment` reproduces the input.
///
/// ```ignore
/// assert_eq!(split_url("/a.png?v=2#top"), ("/a.png", "?v=2", "#top"));
/// ```
#[inline]
pub fn split_url(url: &str) -> (&str, &str, &str) {
    let (rest, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    let (path, query) = match rest.find('?') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };
    (path, query, fragment)
}

/// Directory part of a slash-separated path (`css/site.css` -> `css`).
#[inline]
pub fn url_dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Lexically normalize a slash-separated URL path.
///
/// Collapses repeated slashes and resolves `.` and `..` segments. A `..`
/// above the root is dropped. Leading and trailing slashes are preserved.
///
/// ```ignore
/// assert_eq!(normalize_url_path("/site/css/../img/./x.png"), "/site/img/x.png");
/// ```
pub fn normalize_url_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(path.len());
    if path.starts_with('/') {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if path.ends_with('/') && !segments.is_empty() {
        out.push('/');
    }
    out
}

/// Join a slash-separated relative path under `root`, resolving `.`/`..`.
///
/// Returns `None` when the path climbs above `root`.
pub fn join_under_root(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    let mut path = root.to_path_buf();
    path.extend(segments);
    Some(path)
}

/// Convert a relative filesystem path to a slash-separated string.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, falling back to joining relative paths
/// with the current directory.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Get the modification time of a file.
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if file A is newer than file B
///
/// Returns `false` if either file doesn't exist or times can't be compared.
pub fn is_newer_than(a: &Path, b: &Path) -> bool {
    let (Some(a_time), Some(b_time)) = (get_mtime(a), get_mtime(b)) else {
        return false;
    };
    a_time > b_time
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_external_link() {
        assert!(is_external_link("https://example.com/a.png"));
        assert!(is_external_link("mailto:user@example.com"));
        assert!(is_external_link("//cdn.example.com/font.woff"));
        assert!(!is_external_link("/img/a.png"));
        assert!(!is_external_link("./img/a.png"));
        assert!(!is_external_link("#section"));
    }

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("/a.png?v=2#top"), ("/a.png", "?v=2", "#top"));
        assert_eq!(split_url("/a.png#top"), ("/a.png", "", "#top"));
        assert_eq!(split_url("/a.png?v=2"), ("/a.png", "?v=2", ""));
        assert_eq!(split_url("/a.png"), ("/a.png", "", ""));
        // `?` inside the fragment belongs to the fragment
        assert_eq!(split_url("/a.png#x?y"), ("/a.png", "", "#x?y"));
    }

    #[test]
    fn test_url_dirname() {
        assert_eq!(url_dirname("css/site.css"), "css");
        assert_eq!(url_dirname("a/b/c.css"), "a/b");
        assert_eq!(url_dirname("site.css"), "");
    }

    #[test]
    fn test_normalize_url_path() {
        assert_eq!(normalize_url_path("/site/css/../img/./x.png"), "/site/img/x.png");
        assert_eq!(normalize_url_path("//a//b/"), "/a/b/");
        assert_eq!(normalize_url_path("/../x.png"), "/x.png");
        assert_eq!(normalize_url_path("/"), "/");
        assert_eq!(normalize_url_path("a/./b"), "a/b");
    }

    #[test]
    fn test_join_under_root() {
        let root = Path::new("/srv/site");
        assert_eq!(
            join_under_root(root, "css/../img/x.png"),
            Some(PathBuf::from("/srv/site/img/x.png"))
        );
        assert_eq!(
            join_under_root(root, "/img/x.png"),
            Some(PathBuf::from("/srv/site/img/x.png"))
        );
        assert_eq!(join_under_root(root, "../etc/passwd"), None);
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("a/b/c.html")), "a/b/c.html");
    }

    #[test]
    fn test_normalize_path_relative() {
        assert!(normalize_path(Path::new("relative/path/file.txt")).is_absolute());
    }

    #[test]
    fn test_is_newer_than_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, "a").unwrap();
        assert!(!is_newer_than(&a, &dir.path().join("missing")));
        assert!(!is_newer_than(&dir.path().join("missing"), &a));
    }
}
