//! `decant compress`: run one pipeline over a markup block.

use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use super::BlockType;
use crate::{
    asset::{self, BasePaths},
    config::SiteConfig,
};

/// Compress the block in `file` (or stdin) and print the emitted tags.
pub fn compress_block(kind: BlockType, file: Option<&Path>, config: &SiteConfig) -> Result<()> {
    let block = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let tags = run(kind, &block, &config.base_paths())?;
    if !tags.is_empty() {
        println!("{tags}");
    }
    Ok(())
}

fn run(kind: BlockType, block: &str, paths: &BasePaths) -> asset::Result<String> {
    match kind {
        BlockType::Css => asset::compress_css(block, paths),
        BlockType::Js => asset::compress_js(block, paths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_dispatches_by_kind() {
        let dir = TempDir::new().unwrap();
        let paths = BasePaths::new("/", dir.path(), dir.path().join("out"), "assets");
        let block = "<style>a{color:red}</style><script>var a = 1;</script>";

        let css = run(BlockType::Css, block, &paths).unwrap();
        assert!(css.starts_with("<link rel=\"stylesheet\""));
        let js = run(BlockType::Js, block, &paths).unwrap();
        assert!(js.starts_with("<script src=\"/assets/"));
    }
}
