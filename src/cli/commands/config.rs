//! `shieldwall config`: print or check the effective configuration.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::display::{action_success, output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Arguments for `shieldwall config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Which action to take.
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration
    Show,
    /// Check the configuration and report problems
    Validate,
}

/// Effective configuration with secrets masked.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    /// Merged configuration.
    #[serde(flatten)]
    pub config: Config,
}

impl CommandOutput for ConfigView {
    fn to_human(&self) -> String {
        let mut config = self.config.clone();
        if config.ai.api_key.is_some() {
            config.ai.api_key = Some("***".to_string());
        }
        serde_yaml::to_string(&config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or_default();
        if let Some(key) = value.pointer_mut("/ai/api_key") {
            if !key.is_null() {
                *key = serde_json::Value::String("***".to_string());
            }
        }
        value
    }
}

/// Result of `config validate`.
#[derive(Debug, Serialize)]
pub struct ValidationOutput {
    /// Whether every check passed.
    pub valid: bool,
    /// Success note or the first failed check.
    pub message: String,
}

impl CommandOutput for ValidationOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

/// Run a config subcommand.
pub fn execute(args: ConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => output(&ConfigView { config }, json_mode),
        ConfigCommands::Validate => {
            ConfigLoader::validate(&config).context("Configuration is invalid")?;
            output(
                &ValidationOutput {
                    valid: true,
                    message: "Configuration is valid".to_string(),
                },
                json_mode,
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_masked() {
        let mut config = Config::default();
        config.ai.api_key = Some("sk-secret".to_string());
        let view = ConfigView { config };

        assert!(!view.to_human().contains("sk-secret"));
        assert_eq!(view.to_json()["ai"]["api_key"], "***");
    }
}
