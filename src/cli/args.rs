//! Command-line interface definitions.

use crate::config::Placement;
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Stage and gzip web UI assets for embedded flash filesystem images
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(short = 'C', long, global = true, default_value = "webstage.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a default webstage.toml into the current directory
    Init,

    /// Build the frontend, stage its output and compress the web assets
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Compress an already staged tree without building or staging
    #[command(visible_alias = "c")]
    Compress {
        #[command(flatten)]
        trees: TreeArgs,
    },

    /// Report firmware size, flash usage and upload options
    #[command(visible_alias = "k")]
    Check {
        /// Firmware binary (default: `firmware.path` from the config)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        firmware: Option<PathBuf>,
    },
}

/// Arguments of the `build` command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Frontend build output directory (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Use the existing frontend output instead of running the build
    #[arg(long)]
    pub skip_frontend: bool,

    #[command(flatten)]
    pub trees: TreeArgs,
}

/// Staging/output overrides shared by `build` and `compress`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TreeArgs {
    /// Staging directory (relative to project root)
    #[arg(short = 't', long, value_hint = clap::ValueHint::DirPath)]
    pub staging: Option<PathBuf>,

    /// Output directory for compressed artifacts (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Artifact placement policy
    #[arg(short, long, value_enum)]
    pub placement: Option<Placement>,
}

#[allow(unused)]
impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init)
    }
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_compress(&self) -> bool {
        matches!(self.command, Commands::Compress { .. })
    }
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check { .. })
    }
}
