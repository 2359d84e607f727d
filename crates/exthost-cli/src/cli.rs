//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Extension host tool - inspect extension bundles and their load order
#[derive(Parser, Debug)]
#[command(name = "extctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extensions directory to scan
    #[arg(short, long, global = true, env = "EXTCTL_DIR", conflicts_with = "config")]
    pub dir: Option<PathBuf>,

    /// Manager configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Register every bundle in the extensions directory
    ///
    /// Lists the bundles that registered and the ones that were skipped,
    /// with the reason.
    Scan {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the descriptor of one bundle archive
    Inspect {
        /// Path to the bundle archive
        archive: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the order bundles would load in, and any dependency cycles
    Plan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_json() {
        let cli = Cli::try_parse_from(["extctl", "--dir", "ext", "scan", "--json"]).unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("ext")));
        assert_eq!(cli.command, Commands::Scan { json: true });
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::try_parse_from(["extctl", "inspect", "a.jar"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Inspect {
                archive: PathBuf::from("a.jar"),
                json: false,
            }
        );
    }

    #[test]
    fn test_dir_conflicts_with_config() {
        let result = Cli::try_parse_from(["extctl", "--dir", "a", "--config", "b.toml", "plan"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["extctl", "plan", "--verbose", "--dir", "ext"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command, Commands::Plan);
    }
}
