//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Static site asset compressor and cache-buster
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: decant.toml)
    #[arg(short = 'C', long, default_value = "decant.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site into the output directory
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Compress one markup block and print the resulting tags
    #[command(visible_alias = "c")]
    Compress {
        /// Which pipeline to run
        #[arg(value_enum)]
        kind: BlockType,

        /// File holding the markup block (default: stdin)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },
}

/// Asset pipeline selected on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Css,
    Js,
}

/// Build command arguments
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Site source directory (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Public URL prefix the site is served under
    #[arg(short, long)]
    pub url: Option<String>,

    /// Output directory path (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Compress CSS/JS blocks and cache-tag static files
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub compress: Option<bool>,

    /// Clean output directory completely before building
    #[arg(long)]
    pub clean: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["decant", "build", "-u", "/site/", "-c", "false", "--clean"]).unwrap();
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(build_args.url.as_deref(), Some("/site/"));
        assert_eq!(build_args.compress, Some(false));
        assert!(build_args.clean);
        assert_eq!(cli.config, PathBuf::from("decant.toml"));
    }

    #[test]
    fn test_parse_compress_flag_without_value() {
        let cli = Cli::try_parse_from(["decant", "build", "--compress"]).unwrap();
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(build_args.compress, Some(true));
    }

    #[test]
    fn test_parse_compress_command() {
        let cli = Cli::try_parse_from(["decant", "-C", "site.toml", "compress", "js", "head.html"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        let Commands::Compress { kind, file, verbose } = cli.command else {
            panic!("expected compress");
        };
        assert_eq!(kind, BlockType::Js);
        assert_eq!(file, Some(PathBuf::from("head.html")));
        assert!(!verbose);
    }
}
