//! Content hashing for cache-busting filenames.
//!
//! A cache tag is the first [`TAG_LEN`] hex characters of a blake3 digest.
//! The same bytes always produce the same tag, across calls and processes.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Length of a cache tag in hex characters.
pub const TAG_LEN: usize = 12;

/// Files that are published under a tagged name as well as their own.
static RE_CACHE_BUSTABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:jpe?g|gif|png|svg|webp|ttf|otf|eot|woff2?)$").unwrap()
});

/// Compute the cache tag of in-memory content.
#[inline]
pub fn hash_content<T: AsRef<[u8]> + ?Sized>(content: &T) -> String {
    let digest = blake3::hash(content.as_ref());
    hex::encode(&digest.as_bytes()[..TAG_LEN / 2])
}

/// Compute the cache tag of a file's raw bytes (streaming).
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(hex::encode(&hasher.finalize().as_bytes()[..TAG_LEN / 2]))
}

/// Content-addressed location: `directory/<hash(content)>.<extension>`.
pub fn cache_path<T: AsRef<[u8]> + ?Sized>(content: &T, directory: &Path, extension: &str) -> PathBuf {
    directory.join(format!("{}.{}", hash_content(content), extension))
}

/// Check whether `s` has the shape of a cache tag (12 lowercase hex chars).
#[inline]
pub fn is_cache_tag(s: &str) -> bool {
    s.len() == TAG_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Whether a path or URL path names a file the build publishes with a
/// cache tag.
///
/// References are only ever tagged when this holds, so every tagged URL has
/// a tagged copy in the output.
#[inline]
pub fn is_cache_bustable(path: &str) -> bool {
    RE_CACHE_BUSTABLE.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_content_shape() {
        let tag = hash_content("body{color:red}");
        assert_eq!(tag.len(), TAG_LEN);
        assert!(is_cache_tag(&tag));
    }

    #[test]
    fn test_hash_content_deterministic() {
        assert_eq!(hash_content("a{}"), hash_content("a{}"));
        assert_eq!(hash_content("a{}"), hash_content(b"a{}".as_slice()));
        assert_ne!(hash_content("a{}"), hash_content("b{}"));
    }

    #[test]
    fn test_hash_file_matches_content_hash() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("logo.png");
        fs::write(&file, b"\x89PNG fake").unwrap();

        assert_eq!(hash_file(&file).unwrap(), hash_content(b"\x89PNG fake".as_slice()));
        assert!(hash_file(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_cache_path() {
        let dir = Path::new("/out/assets");
        let a = cache_path("x{}", dir, "css");
        let b = cache_path("x{}", dir, "css");
        let c = cache_path("y{}", dir, "css");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, dir.join(format!("{}.css", hash_content("x{}"))));
    }

    #[test]
    fn test_is_cache_tag() {
        assert!(is_cache_tag("abcdef012345"));
        assert!(!is_cache_tag("abcdef01234"));
        assert!(!is_cache_tag("ABCDEF012345"));
        assert!(!is_cache_tag("ghijkl012345"));
    }

    #[test]
    fn test_is_cache_bustable() {
        assert!(is_cache_bustable("img/a.JPG"));
        assert!(is_cache_bustable("/img/photo.webp"));
        assert!(is_cache_bustable("fonts/a.woff2"));
        assert!(is_cache_bustable("../fonts/a.eot"));
        assert!(!is_cache_bustable("css/site.css"));
        assert!(!is_cache_bustable("js/app.js"));
        assert!(!is_cache_bustable("README"));
    }
}
