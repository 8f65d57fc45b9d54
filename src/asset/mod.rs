//! Asset compression and content-addressed caching.

mod compress;
mod error;
mod group;
pub mod hash;
mod minify;
mod paths;
mod rewrite;
mod scan;
pub mod store;

// Types
pub use error::{AssetError, Result};
pub use paths::BasePaths;

// Pipelines (side effects)
pub use compress::{compress_css, compress_js};

// Reference rewriting
pub use rewrite::add_image_cache_tags;
