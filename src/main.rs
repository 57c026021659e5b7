//! Shieldwall CLI entry point.

use clap::Parser;

use shieldwall::cli::{commands, handle_error, Cli, Commands};
use shieldwall::infrastructure::config::ConfigLoader;
use shieldwall::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .unwrap_or_else(|err| handle_error(err, cli.json));

    let mut log_config = LogConfig::from(&config.logging);
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let logger = LoggerImpl::init(&log_config).unwrap_or_else(|err| handle_error(err, cli.json));

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, cli.json).await,
        Commands::Evaluate(args) => commands::evaluate::execute(args, config, cli.json).await,
        Commands::Catalog(args) => commands::catalog::execute(args, config, cli.json),
        Commands::Config(args) => commands::config::execute(args, config, cli.json),
    };

    if let Err(err) = result {
        // Flush file logs before exiting.
        drop(logger);
        handle_error(err, cli.json);
    }
}
