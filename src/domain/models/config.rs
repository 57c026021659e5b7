//! Configuration sections and their defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Shieldwall
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Static catalog file locations
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Local threat heuristics
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Remediation plan composition
    #[serde(default)]
    pub composer: ComposerConfig,

    /// Threat enrichment policy
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Coordinator timings and limits
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Action execution settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Delegated AI backend
    #[serde(default)]
    pub ai: AiConfig,

    /// Signal feed settings
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Paths to the static protocol, token and dependency records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogConfig {
    /// Protocol records JSON file.
    #[serde(default = "default_protocols_path")]
    pub protocols_path: String,

    /// Token records JSON file.
    #[serde(default = "default_tokens_path")]
    pub tokens_path: String,

    /// Dependency records JSON file.
    #[serde(default = "default_dependencies_path")]
    pub dependencies_path: String,
}

fn default_protocols_path() -> String {
    ".shieldwall/protocols.json".to_string()
}

fn default_tokens_path() -> String {
    ".shieldwall/tokens.json".to_string()
}

fn default_dependencies_path() -> String {
    ".shieldwall/dependencies.json".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            protocols_path: default_protocols_path(),
            tokens_path: default_tokens_path(),
            dependencies_path: default_dependencies_path(),
        }
    }
}

/// Keyword heuristics used when the AI backend is unavailable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EvaluatorConfig {
    /// Words that flag a signal as a potential threat
    #[serde(default = "default_threat_keywords")]
    pub threat_keywords: Vec<String>,

    /// Chain assumed when the signal names none
    #[serde(default = "default_chain")]
    pub default_chain: String,

    /// Chain names recognised in signal text, in addition to catalog chains
    #[serde(default = "default_known_chains")]
    pub known_chains: Vec<String>,
}

fn default_threat_keywords() -> Vec<String> {
    [
        "vulnerability",
        "exploit",
        "attack",
        "hacked",
        "breach",
        "risk",
        "compromise",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_chain() -> String {
    "ethereum".to_string()
}

fn default_known_chains() -> Vec<String> {
    [
        "ethereum", "arbitrum", "optimism", "polygon", "base", "bsc", "avalanche", "solana",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            threat_keywords: default_threat_keywords(),
            default_chain: default_chain(),
            known_chains: default_known_chains(),
        }
    }
}

/// Remediation plan composition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComposerConfig {
    /// Token that unaffected positions are swapped into
    #[serde(default = "default_safe_token")]
    pub safe_token: String,
}

fn default_safe_token() -> String {
    "USDC".to_string()
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            safe_token: default_safe_token(),
        }
    }
}

/// Enrichment policy. All flags off means pass-through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EnrichmentConfig {
    /// Raise `medium` threats to `high`
    #[serde(default)]
    pub escalate_medium_to_high: bool,

    /// Add every dependent token of the affected protocols
    #[serde(default)]
    pub expand_dependent_tokens: bool,
}

/// Coordinator timings and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowConfig {
    /// Delay before `completed` returns to `idle`
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,

    /// Upper bound for one evaluation, enrichment or composition call
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,

    /// Capacity of the inbound command queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum retained signal history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

const fn default_completion_delay_ms() -> u64 {
    5_000
}

const fn default_stage_timeout_ms() -> u64 {
    120_000
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_history_limit() -> usize {
    1_000
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            completion_delay_ms: default_completion_delay_ms(),
            stage_timeout_ms: default_stage_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            history_limit: default_history_limit(),
        }
    }
}

impl WorkflowConfig {
    /// Delay before `completed` returns to `idle`.
    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }

    /// Limit for the evaluation, enrichment and composition stages.
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

/// Action execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Upper bound for a single action
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
}

const fn default_action_timeout_ms() -> u64 {
    30_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: default_action_timeout_ms(),
        }
    }
}

impl ExecutorConfig {
    /// Limit for a single action.
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

/// Delegated AI backend (Anthropic Messages API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AiConfig {
    /// Use the AI backend before falling back to heuristics
    #[serde(default)]
    pub enabled: bool,

    /// API key (can also be set via ANTHROPIC_API_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for API (for testing/proxies)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Sustained request rate
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

const fn default_ai_timeout() -> u64 {
    30
}

const fn default_requests_per_second() -> u32 {
    2
}

const fn default_max_retries() -> u32 {
    2
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_ai_timeout(),
            requests_per_second: default_requests_per_second(),
            max_retries: default_max_retries(),
        }
    }
}

/// Signal feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedConfig {
    /// JSON file of scripted signals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Poll cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_poll_interval_ms() -> u64 {
    10_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl FeedConfig {
    /// Delay between feed polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
