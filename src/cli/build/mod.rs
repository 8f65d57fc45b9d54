//! Site building orchestration.
//!
//! Build pipeline phases:
//! - **Init** - Clean output, create the cache directory
//! - **Collect** - Walk the site root, drop private files, classify the rest
//! - **Process** - Render pages and copy static files in parallel
//! - **Finalize** - Summary logging

mod pipeline;

use anyhow::Result;

use crate::{config::SiteConfig, log, utils::plural_count};

/// Build the entire site into `build.output`.
pub fn build_site(config: &SiteConfig) -> Result<()> {
    pipeline::init_build(config)?;

    let files = pipeline::collect_build_files(config);
    let progress = pipeline::create_progress(&files);

    let stats = pipeline::process_files(config, &files, Some(&progress))?;
    progress.finish();

    log!(
        "build";
        "{} rendered, {} copied, {} cache-tagged",
        plural_count(files.pages.len(), "page"),
        plural_count(stats.copied, "file"),
        plural_count(stats.tagged, "file")
    );
    Ok(())
}
