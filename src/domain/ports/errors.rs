//! Errors surfaced by port implementations.

use thiserror::Error;

/// Failures of the delegated AI backend.
///
/// The evaluator and composer treat every variant as a trigger for their
/// local fallback, never as a workflow error.
#[derive(Debug, Error)]
pub enum AnalystError {
    /// The backend has no credentials or is switched off.
    #[error("AI backend not configured: {0}")]
    NotConfigured(String),

    /// The backend could not be reached or has nothing to answer.
    #[error("AI backend unavailable: {0}")]
    Unavailable(String),

    /// The backend asked us to slow down.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The backend answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The answer could not be parsed.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Transport failure.
    #[error("Network error: {0}")]
    Network(String),
}

impl AnalystError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Network(_) | Self::Unavailable(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured(_) | Self::MalformedResponse(_) => false,
        }
    }
}

impl From<serde_json::Error> for AnalystError {
    fn from(err: serde_json::Error) -> Self {
        AnalystError::MalformedResponse(err.to_string())
    }
}

/// Failures reported by the execution backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// This action failed; later actions may still succeed.
    #[error("Action rejected: {0}")]
    ActionRejected(String),

    /// The backend itself is down; no later action can succeed either.
    #[error("Execution backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Failures of a signal feed poll.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed source cannot be read.
    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    /// The feed content is not valid.
    #[error("Malformed feed record: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AnalystError::RateLimited("slow down".into()).is_transient());
        assert!(AnalystError::Api { status: 503, body: String::new() }.is_transient());
        assert!(AnalystError::Api { status: 429, body: String::new() }.is_transient());
        assert!(!AnalystError::Api { status: 400, body: String::new() }.is_transient());
        assert!(!AnalystError::MalformedResponse("{".into()).is_transient());
    }
}
