//! extctl
//!
//! Command-line tool for inspecting extension bundles: what registers, what
//! is skipped and in which order the rest would load.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;

use exthost_core::ManagerConfig;

use cli::{Cli, Commands};
use error::{CliError, Result};

/// Directory scanned when neither `--dir` nor `--config` is given.
const DEFAULT_EXTENSIONS_DIR: &str = "extensions";

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    exthost_core::logging::init_with_default(level)
        .map_err(|e| CliError::user(format!("failed to initialize logging: {e}")))?;
    tracing::debug!("Verbose mode enabled");

    let config = resolve_config(&cli)?;
    tracing::debug!(?config, "Resolved manager configuration");

    match cli.command {
        Commands::Scan { json } => commands::run_scan(&config, json),
        Commands::Inspect { archive, json } => commands::run_inspect(&config, &archive, json),
        Commands::Plan => commands::run_plan(&config),
    }
}

fn resolve_config(cli: &Cli) -> Result<ManagerConfig> {
    if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(CliError::user(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(ManagerConfig::from_path(path)?);
    }

    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?.join(DEFAULT_EXTENSIONS_DIR),
    };
    Ok(ManagerConfig::new(dir))
}
