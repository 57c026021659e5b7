//! Anthropic Messages API adapter for threat assessment and action planning.
//!
//! Both ports share one HTTP client, one request rate limiter and one retry
//! policy. The model is asked for a bare JSON answer; code fences or prose
//! around the JSON are tolerated.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::models::{Action, AiConfig, DependencyGraph, Threat};
use crate::domain::ports::{
    ActionPlanner, AnalystError, AnalystVerdict, AssessmentRequest, ThreatAnalyst,
};

const API_VERSION: &str = "2023-06-01";

const ASSESS_SYSTEM_PROMPT: &str = "You are a DeFi security analyst. Decide whether a social media \
post reports a real security threat to one of the monitored protocols. Answer with JSON only, \
matching: {\"isThreat\": bool, \"threatDetails\": {\"description\": string, \
\"affectedProtocols\": [string], \"affectedTokens\": [string], \"chain\": string, \
\"severity\": \"low\"|\"medium\"|\"high\"|\"critical\"}}. Omit threatDetails when isThreat is \
false. Use protocol and token names exactly as listed in the catalog.";

const PLAN_SYSTEM_PROMPT: &str = "You are a DeFi risk manager. Given a confirmed threat and the \
protocol to token dependency graph, propose protective actions. Answer with a JSON array only; \
each element is {\"type\": \"withdraw\"|\"swap\"|\"revoke\", \"protocol\": string, \"token\": \
string, \"params\": object}. Swaps name their target in params.toToken.";

/// Configuration for the Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (read from ANTHROPIC_API_KEY when unset).
    pub api_key: Option<String>,
    /// Messages API root, without the `/v1/messages` suffix.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Client-side request rate.
    pub requests_per_second: u32,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// First retry delay.
    pub initial_backoff: Duration,
    /// Ceiling for the retry delay.
    pub max_backoff: Duration,
}

impl From<&AiConfig> for AnthropicConfig {
    fn from(config: &AiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_tokens: 1024,
            requests_per_second: config.requests_per_second,
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl AnthropicConfig {
    /// Get API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Plans are accepted either as a bare array or wrapped in `{"actions": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlanPayload {
    Bare(Vec<Action>),
    Wrapped { actions: Vec<Action> },
}

/// Anthropic-backed [`ThreatAnalyst`] and [`ActionPlanner`].
pub struct AnthropicAnalyst {
    config: AnthropicConfig,
    api_key: String,
    client: Client,
    limiter: DefaultDirectRateLimiter,
}

impl AnthropicAnalyst {
    /// Build the client. Fails with `NotConfigured` when no API key is available.
    pub fn new(config: AnthropicConfig) -> Result<Self, AnalystError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            AnalystError::NotConfigured("ANTHROPIC_API_KEY not set".to_string())
        })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalystError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            config,
            api_key,
            client,
        })
    }

    /// Send one prompt, retrying transient failures with exponential backoff.
    async fn complete(&self, system: &str, user: &str) -> Result<String, AnalystError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_backoff)
            .with_max_interval(self.config.max_backoff)
            .with_max_elapsed_time(None)
            .build();
        let max_retries = self.config.max_retries;
        let mut attempt = 0u32;

        backoff::future::retry(policy, || {
            attempt += 1;
            let current = attempt;
            async move {
                self.send_once(system, user).await.map_err(|err| {
                    if err.is_transient() && current <= max_retries {
                        warn!(attempt = current, error = %err, "transient AI backend error, retrying");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }

    async fn send_once(&self, system: &str, user: &str) -> Result<String, AnalystError> {
        self.limiter.until_ready().await;

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalystError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalystError::RateLimited(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalystError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnalystError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let text = result
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        debug!(chars = text.len(), "AI backend answered");
        Ok(text)
    }
}

/// The JSON document inside a model answer.
///
/// Strips a surrounding code fence, then falls back to the outermost
/// object or array in the text.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
        if let Some(end) = body.rfind("```") {
            return body[..end].trim();
        }
    }

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[async_trait]
impl ThreatAnalyst for AnthropicAnalyst {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn assess(&self, request: &AssessmentRequest) -> Result<AnalystVerdict, AnalystError> {
        let catalog = serde_json::to_string(&request.catalog)?;
        let prompt = format!("Catalog:\n{catalog}\n\nPost:\n{}", request.content);
        let answer = self.complete(ASSESS_SYSTEM_PROMPT, &prompt).await?;
        Ok(serde_json::from_str(extract_json(&answer))?)
    }
}

#[async_trait]
impl ActionPlanner for AnthropicAnalyst {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn propose(
        &self,
        threat: &Threat,
        graph: &DependencyGraph,
    ) -> Result<Vec<Action>, AnalystError> {
        let prompt = format!(
            "Threat:\n{}\n\nDependency graph:\n{}",
            serde_json::to_string(threat)?,
            serde_json::to_string(graph)?
        );
        let answer = self.complete(PLAN_SYSTEM_PROMPT, &prompt).await?;
        let plan = match serde_json::from_str(extract_json(&answer))? {
            PlanPayload::Bare(actions) | PlanPayload::Wrapped { actions } => actions,
        };
        Ok(plan)
    }
}
