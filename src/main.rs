//! webstage - stage and gzip web UI assets for embedded flash filesystems.

#![allow(dead_code)]

mod cli;
mod config;
mod hooks;
mod logger;
mod pipeline;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ProjectConfig::load(&cli)?;

    let success = match &cli.command {
        Commands::Init => {
            cli::init::write_config(&config.config_path)?;
            log!("init"; "wrote {}", config.config_path.display());
            true
        }
        Commands::Build { .. } => cli::build::build(&config),
        Commands::Compress { .. } => cli::build::compress(&config),
        Commands::Check { .. } => cli::check::check(&config),
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
