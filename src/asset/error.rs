//! Asset pipeline error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compressing a block of declared assets.
///
/// Only declared `<link>`/`<script src>` targets and cache writes can fail.
/// References nested inside asset content never produce an error: an
/// unresolvable nested URL is passed through unchanged.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("`{url}` isn't accessible via base url `{base_url}` and can't be compressed")]
    NotAccessible { url: String, base_url: String },

    #[error("`{url}` could not be found at `{}`", path.display())]
    FileNotFound { url: String, path: PathBuf },

    #[error("IO error at `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssetError>;
