//! CLI type definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::catalog::CatalogArgs;
use super::commands::config::ConfigArgs;
use super::commands::evaluate::EvaluateArgs;
use super::commands::run::RunArgs;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(name = "shieldwall")]
#[command(about = "Shieldwall - signal-driven protection for DeFi positions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .shieldwall/config.yaml merged with local.yaml)
    #[arg(short, long, global = true, env = "SHIELDWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a signal feed and protect positions as threats arrive
    Run(RunArgs),

    /// Evaluate one post and show the plan without executing it
    Evaluate(EvaluateArgs),

    /// Inspect the protocol and token catalog
    Catalog(CatalogArgs),

    /// Show or validate configuration
    Config(ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "shieldwall",
            "run",
            "--feed",
            "tweets.json",
            "--drain",
            "--json",
            "-c",
            "custom.yaml",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.feed, Some(PathBuf::from("tweets.json")));
                assert!(args.drain);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_evaluate_text() {
        let cli = Cli::try_parse_from(["shieldwall", "evaluate", "Aave exploit"]).unwrap();
        assert!(matches!(cli.command, Commands::Evaluate(args) if args.text == "Aave exploit"));
    }
}
