//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project configuration, relative to the working directory.
pub const CONFIG_DIR: &str = ".shieldwall";

/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "SHIELDWALL_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown `logging.level`.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`.
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown `logging.rotation`.
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// A setting that must be positive is zero.
    #[error("Invalid {0}: must be greater than zero")]
    ZeroValue(&'static str),

    /// `composer.safe_token` is blank.
    #[error("Safe token cannot be empty")]
    EmptySafeToken,

    /// `evaluator.threat_keywords` is empty.
    #[error("At least one threat keyword is required")]
    NoThreatKeywords,

    /// `ai.requests_per_second` is zero.
    #[error("Invalid AI rate limit: {0}. Must be positive")]
    InvalidRateLimit(u32),

    /// AI is enabled without a model.
    #[error("AI backend enabled without a model")]
    MissingModel,

    /// Any other invalid setting.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .shieldwall/config.yaml (project config)
    /// 3. .shieldwall/local.yaml (local overrides, optional)
    /// 4. Environment variables (SHIELDWALL_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(Path::new("."))
    }

    /// Same as [`ConfigLoader::load`] with the project rooted at `root`.
    pub fn load_from_dir(root: &Path) -> Result<Config> {
        let dir = root.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let workflow = &config.workflow;
        if workflow.completion_delay_ms == 0 {
            return Err(ConfigError::ZeroValue("workflow.completion_delay_ms"));
        }
        if workflow.stage_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("workflow.stage_timeout_ms"));
        }
        if workflow.queue_capacity == 0 {
            return Err(ConfigError::ZeroValue("workflow.queue_capacity"));
        }
        if workflow.history_limit == 0 {
            return Err(ConfigError::ZeroValue("workflow.history_limit"));
        }
        if config.executor.action_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("executor.action_timeout_ms"));
        }
        if config.feed.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue("feed.poll_interval_ms"));
        }

        if config.composer.safe_token.trim().is_empty() {
            return Err(ConfigError::EmptySafeToken);
        }

        if config
            .evaluator
            .threat_keywords
            .iter()
            .all(|k| k.trim().is_empty())
        {
            return Err(ConfigError::NoThreatKeywords);
        }

        if config.evaluator.default_chain.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "evaluator.default_chain cannot be empty".to_string(),
            ));
        }

        if config.ai.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(config.ai.requests_per_second));
        }

        if config.ai.enabled && config.ai.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_with(config: &str, local: Option<&str>) -> TempDir {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yaml"), config).unwrap();
        if let Some(local) = local {
            fs::write(dir.join("local.yaml"), local).unwrap();
        }
        root
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.composer.safe_token, "USDC");
        assert_eq!(config.workflow.completion_delay_ms, 5_000);
        assert!(!config.ai.enabled);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: json
composer:
  safe_token: DAI
enrichment:
  escalate_medium_to_high: true
workflow:
  completion_delay_ms: 250
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.composer.safe_token, "DAI");
        assert!(config.enrichment.escalate_medium_to_high);
        assert!(!config.enrichment.expand_dependent_tokens);
        assert_eq!(config.workflow.completion_delay_ms, 250);
        assert_eq!(config.workflow.queue_capacity, 64);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_zero_workflow_values() {
        let mut config = Config::default();
        config.workflow.completion_delay_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroValue("workflow.completion_delay_ms"))
        ));

        let mut config = Config::default();
        config.workflow.queue_capacity = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroValue("workflow.queue_capacity"))
        ));

        let mut config = Config::default();
        config.workflow.history_limit = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_composer_and_evaluator() {
        let mut config = Config::default();
        config.composer.safe_token = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptySafeToken)
        ));

        let mut config = Config::default();
        config.evaluator.threat_keywords = vec![String::new()];
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::NoThreatKeywords)
        ));
    }

    #[test]
    fn test_validate_ai_settings() {
        let mut config = Config::default();
        config.ai.requests_per_second = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRateLimit(0))
        ));

        let mut config = Config::default();
        config.ai.enabled = true;
        config.ai.model = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::MissingModel)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let root = project_with(
            "logging:\n  level: info\n  format: json\ncomposer:\n  safe_token: DAI\n",
            Some("logging:\n  level: debug\n"),
        );

        let config = temp_env::with_vars_unset(
            ["SHIELDWALL_LOGGING__LEVEL", "SHIELDWALL_COMPOSER__SAFE_TOKEN"],
            || ConfigLoader::load_from_dir(root.path()),
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug", "Local override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.composer.safe_token, "DAI");
    }

    #[test]
    fn test_env_override() {
        let root = project_with("workflow:\n  completion_delay_ms: 1000\n", None);

        let config = temp_env::with_vars(
            [
                ("SHIELDWALL_WORKFLOW__COMPLETION_DELAY_MS", Some("42")),
                ("SHIELDWALL_ENRICHMENT__EXPAND_DEPENDENT_TOKENS", Some("true")),
            ],
            || ConfigLoader::load_from_dir(root.path()),
        )
        .unwrap();

        assert_eq!(config.workflow.completion_delay_ms, 42);
        assert!(config.enrichment.expand_dependent_tokens);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let root = project_with("logging:\n  level: loud\n", None);
        let path = root.path().join(CONFIG_DIR).join("config.yaml");
        assert!(ConfigLoader::load_from_file(path).is_err());
        assert!(ConfigLoader::load_from_file(root.path().join("missing.yaml")).is_err());
    }
}
