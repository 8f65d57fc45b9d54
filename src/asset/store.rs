//! Write-once storage for content-addressed files.
//!
//! Several builds (or threads of one build) may target the same cache
//! directory. A path's content is fully determined by its name, so whoever
//! writes first wins and everyone else is a no-op. Files are written to a
//! temporary sibling and moved into place without clobbering, so readers
//! never observe a partial file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::error::{AssetError, Result};

/// Create a directory tree, treating "already exists" as success.
pub fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(AssetError::io(path, e)),
    }
}

/// Write `content` to `path` unless the path already exists.
///
/// Returns `true` if this call created the file.
pub fn write_if_absent(path: &Path, content: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| AssetError::io(parent, e))?;
    tmp.write_all(content)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| AssetError::io(tmp.path(), e))?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        // Lost the race to an identical writer
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(AssetError::io(path, e.error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }

    #[test]
    fn test_write_if_absent_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("public/assets/0123456789ab.css");

        assert!(write_if_absent(&path, b"a{}").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a{}");
    }

    #[test]
    fn test_write_if_absent_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0123456789ab.js");

        assert!(write_if_absent(&path, b"first").unwrap());
        assert!(!write_if_absent(&path, b"second").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn test_write_if_absent_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0123456789ab.css");
        write_if_absent(&path, b"a{}").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_if_absent_concurrent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assets/0123456789ab.css");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || write_if_absent(&path, b"same bytes").unwrap())
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&created| created)
            .count();

        assert_eq!(created, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "same bytes");
    }
}
