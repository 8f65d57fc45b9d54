//! Site configuration management for `decant.toml`.
//!
//! ```toml
//! [build]
//! root = "."            # served at `url`
//! url = "/"
//! output = "public"
//! assets = "assets"     # cache directory inside `output`
//! compress = true
//! private = ['^drafts/']
//! cache_tag_exclude = ["favicon", "apple-touch-icon"]
//! ```
//!
//! Precedence: CLI flags, then the config file, then defaults.

mod error;

pub use error::ConfigError;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use crate::{
    asset::BasePaths,
    cli::{BuildArgs, Cli, Commands},
    debug, log,
    page::PageContext,
    utils::path::{normalize_path, to_slash},
};

/// Icons referenced by fixed, well-known names.
const DEFAULT_CACHE_TAG_EXCLUDE: &[&str] = &[
    "favicon",
    "apple-touch-icon",
    "android-chrome",
    "mstile",
    "safari-pinned-tab",
];

/// Hidden files that are still published.
const PUBLIC_DOTFILES: &[&str] = &[".htaccess"];

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing decant.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Site source directory, served at `url`
    pub root: PathBuf,
    /// Public URL prefix
    pub url: String,
    /// Output directory
    pub output: PathBuf,
    /// Cache directory, relative to `output`
    pub assets: PathBuf,
    /// Compress blocks and cache-tag static files
    pub compress: bool,
    /// Extra regexes (matched against `/`-separated relative paths) for
    /// files that are never published
    pub private: Vec<String>,
    /// URL substrings that are never cache-tagged
    pub cache_tag_exclude: Vec<String>,

    /// Remove output before building (CLI only)
    #[serde(skip)]
    pub clean: bool,

    #[serde(skip)]
    private_patterns: Vec<Regex>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            url: "/".to_string(),
            output: PathBuf::from("public"),
            assets: PathBuf::from("assets"),
            compress: true,
            private: Vec::new(),
            cache_tag_exclude: DEFAULT_CACHE_TAG_EXCLUDE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            clean: false,
            private_patterns: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. Without one, defaults
    /// apply and the project root is the current directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    ..Self::default()
                }
            }
        };

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.apply_command_options(cli);
        config.validate_paths()?;
        config.finalize(&root);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string, warning about unknown fields.
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            log!("warning"; "ignoring unknown config fields: {}", ignored.join(", "));
        }
        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Compress { verbose, .. } => crate::logger::set_verbose(*verbose),
        }
    }

    /// Apply build arguments from CLI.
    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.build.root, args.root.as_ref());
        Self::update_option(&mut self.build.url, args.url.as_ref());
        Self::update_option(&mut self.build.output, args.output.as_ref());
        Self::update_option(&mut self.build.compress, args.compress.as_ref());
        self.build.clean = args.clean;
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve `root`, `output` and the config path against the project root.
    fn finalize(&mut self, root: &Path) {
        self.root = normalize_path(root);
        if let Some(name) = self.config_path.file_name() {
            self.config_path = self.root.join(name);
        }
        self.build.root = Self::expand_path(&self.build.root, &self.root);
        self.build.output = Self::expand_path(&self.build.output, &self.root);
    }

    /// Tilde expansion, then join relative paths with `root`.
    fn expand_path(path: &Path, root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);
        let full_path = if path.is_relative() {
            root.join(&path)
        } else {
            path
        };
        normalize_path(&full_path)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Pre-validate paths before normalization.
    ///
    /// `assets` must stay inside `output`, which is only checkable while it
    /// is still the user-written relative path.
    fn validate_paths(&self) -> Result<(), ConfigError> {
        let assets = &self.build.assets;
        let inside = assets
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if assets.as_os_str().is_empty() || !inside {
            return Err(ConfigError::Validation(format!(
                "[build.assets] must be a relative path inside the output directory, got `{}`",
                assets.display()
            )));
        }
        Ok(())
    }

    /// Validate normalized configuration and compile `private` patterns.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if !self.build.root.is_dir() {
            return Err(ConfigError::Validation(format!(
                "[build.root] `{}` is not a directory",
                self.build.root.display()
            )));
        }
        if self.build.output == self.build.root {
            return Err(ConfigError::Validation(
                "[build.output] must differ from [build.root]".into(),
            ));
        }

        self.build.private_patterns = self
            .build
            .private
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("[build.private] invalid pattern `{pattern}`: {e}"))
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(())
    }

    // ========================================================================
    // accessors
    // ========================================================================

    /// Path/URL mapping for the asset pipeline.
    pub fn base_paths(&self) -> BasePaths {
        BasePaths::new(
            &self.build.url,
            &self.build.root,
            &self.build.output,
            &self.build.assets,
        )
    }

    /// Rendering settings shared by every page.
    pub fn page_context(&self) -> PageContext {
        PageContext {
            paths: self.base_paths(),
            compress: self.build.compress,
            cache_tag_exclude: self.build.cache_tag_exclude.clone(),
        }
    }

    /// Whether a file under `build.root` must stay out of the output.
    ///
    /// Private: hidden files and directories (except `.htaccess`), anything
    /// inside the output directory, the config file itself, and paths
    /// matching a `private` pattern.
    pub fn is_private(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.build.root) else {
            return true;
        };

        let hidden = relative.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            name.starts_with('.') && !PUBLIC_DOTFILES.contains(&name.as_ref())
        });
        if hidden || path.starts_with(&self.build.output) || path == self.config_path {
            return true;
        }

        let slashed = to_slash(relative);
        self.build
            .private_patterns
            .iter()
            .any(|re| re.is_match(&slashed))
    }
}

/// Find config file by searching upward from current directory
///
/// ```text
/// /home/user/site/blog/posts/   ← cwd
/// /home/user/site/decant.toml   ← found!
/// ```
fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// tests
// ============================================================================
