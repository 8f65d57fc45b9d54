use anyhow::{Context, Result, anyhow};
use jwalk::WalkDir;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{
    asset::{
        hash::{hash_file, is_cache_bustable},
        store::ensure_dir,
    },
    config::SiteConfig,
    debug, log,
    logger::ProgressLine,
    page::{PageContext, render_page},
    utils::path::{is_newer_than, to_slash},
};

/// Collected files for the build
pub(super) struct BuildFiles {
    /// HTML pages, rendered through the page layer
    pub pages: Vec<PathBuf>,
    /// Everything else that is published
    pub statics: Vec<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct BuildStats {
    pub copied: usize,
    pub tagged: usize,
}

/// Initialize build environment
pub(super) fn init_build(config: &SiteConfig) -> Result<()> {
    let output = &config.build.output;

    if config.build.clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clean {}", output.display()))?;
        debug!("build"; "cleaned {}", output.display());
    }

    ensure_dir(output)?;
    if config.build.compress {
        ensure_dir(&config.base_paths().assets_root())?;
    }
    Ok(())
}

/// Collect all files to publish
pub(super) fn collect_build_files(config: &SiteConfig) -> BuildFiles {
    let (pages, statics): (Vec<PathBuf>, Vec<PathBuf>) = WalkDir::new(&config.build.root)
        .skip_hidden(false)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|path| !config.is_private(path))
        .partition(|path| is_page(path));

    BuildFiles { pages, statics }
}

fn is_page(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

/// Create the `pages(n/N) files(n/M)` progress display
pub(super) fn create_progress(files: &BuildFiles) -> ProgressLine {
    ProgressLine::new(&[
        ("pages", files.pages.len()),
        ("files", files.statics.len()),
    ])
}

/// Render pages and copy static files in parallel
pub(super) fn process_files(
    config: &SiteConfig,
    files: &BuildFiles,
    progress: Option<&ProgressLine>,
) -> Result<BuildStats> {
    let ctx = config.page_context();
    let has_error = AtomicBool::new(false);
    let copied = AtomicUsize::new(0);
    let tagged = AtomicUsize::new(0);

    let (pages, statics) = rayon::join(
        || {
            run_parallel(&files.pages, &has_error, |path| {
                render_file(path, config, &ctx)?;
                if let Some(p) = progress {
                    p.inc("pages");
                }
                Ok(())
            })
        },
        || {
            run_parallel(&files.statics, &has_error, |path| {
                let outcome = copy_static(path, config)?;
                if outcome.copied {
                    copied.fetch_add(1, Ordering::Relaxed);
                }
                if outcome.tagged {
                    tagged.fetch_add(1, Ordering::Relaxed);
                }
                if let Some(p) = progress {
                    p.inc("files");
                }
                Ok(())
            })
        },
    );
    pages?;
    statics?;

    Ok(BuildStats {
        copied: copied.into_inner(),
        tagged: tagged.into_inner(),
    })
}

/// Apply `f` to every path, stopping at the first failure
fn run_parallel<F>(paths: &[PathBuf], has_error: &AtomicBool, f: F) -> Result<()>
where
    F: Fn(&Path) -> Result<()> + Sync,
{
    paths.par_iter().try_for_each(|path| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        if let Err(e) = f(path.as_path()) {
            if !has_error.swap(true, Ordering::Relaxed) {
                log!("error"; "{}: {:#}", path.display(), e);
            }
            return Err(anyhow!("Build failed"));
        }
        Ok(())
    })
}

/// Mirror a source path into the output directory
fn output_path(path: &Path, config: &SiteConfig) -> Result<PathBuf> {
    let relative = path
        .strip_prefix(&config.build.root)
        .with_context(|| format!("{} is outside the site root", path.display()))?;
    Ok(config.build.output.join(relative))
}

fn render_file(path: &Path, config: &SiteConfig, ctx: &PageContext) -> Result<()> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let page = to_slash(path.strip_prefix(&config.build.root).unwrap_or(path));
    let rendered = render_page(&html, &page, ctx)?;

    let dest = output_path(path, config)?;
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    fs::write(&dest, rendered).with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CopyOutcome {
    copied: bool,
    tagged: bool,
}

/// Copy a static file, adding a `name.<hash>.ext` copy when compressing
///
/// Every file the reference rewriter may tag gets its tagged copy, whether
/// or not it is on the exclusion list: exclusions only keep page references
/// at their plain names, while stylesheets can still point at the file.
fn copy_static(path: &Path, config: &SiteConfig) -> Result<CopyOutcome> {
    let dest = output_path(path, config)?;
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    let mut outcome = CopyOutcome::default();

    // Skip if up-to-date
    if config.build.clean || !dest.exists() || is_newer_than(path, &dest) {
        fs::copy(path, &dest).with_context(|| format!("Failed to copy {}", path.display()))?;
        outcome.copied = true;
    }

    let relative = to_slash(path.strip_prefix(&config.build.root).unwrap_or(path));
    if config.build.compress && is_cache_bustable(&relative) {
        let tag = hash_file(path).with_context(|| format!("Failed to hash {}", path.display()))?;
        let tagged = tagged_path(&dest, &tag);
        if !tagged.exists() {
            fs::copy(path, &tagged)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
            outcome.tagged = true;
        }
    }

    Ok(outcome)
}

/// `dir/name.ext` → `dir/name.<tag>.ext`
fn tagged_path(path: &Path, tag: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{tag}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{tag}"),
    };
    path.with_file_name(name)
}
