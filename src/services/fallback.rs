//! Two-step decision strategy: delegated primary, deterministic fallback.
//!
//! The primary is an optional future (usually an AI backend call); the
//! fallback is a local heuristic that always produces a value. Resolving
//! the chain never fails: a primary error or timeout is logged and the
//! fallback runs instead.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Which step produced the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Produced by the primary step.
    Primary(T),
    /// Produced by the fallback step.
    Fallback(T),
}

impl<T> Resolution<T> {
    /// The value, whichever step produced it.
    pub fn into_inner(self) -> T {
        match self {
            Self::Primary(value) | Self::Fallback(value) => value,
        }
    }

    /// Whether the fallback produced the value.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// `"primary"` or `"fallback"`, for logs.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Primary(_) => "primary",
            Self::Fallback(_) => "fallback",
        }
    }
}

/// A primary/fallback pair evaluated in sequence.
pub struct FallbackChain<Fut, F> {
    stage: &'static str,
    primary: Option<Fut>,
    fallback: F,
    timeout: Option<Duration>,
}

impl<T, E, Fut, F> FallbackChain<Fut, F>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    F: FnOnce() -> T,
{
    /// Chain for `stage`. A missing `primary` goes straight to `fallback`.
    pub fn new(stage: &'static str, primary: Option<Fut>, fallback: F) -> Self {
        Self {
            stage,
            primary,
            fallback,
            timeout: None,
        }
    }

    /// Bound the primary; an elapsed timeout counts as a primary failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return the first successful result.
    pub async fn resolve(self) -> Resolution<T> {
        let Some(primary) = self.primary else {
            debug!(stage = self.stage, "no primary configured, using fallback");
            return Resolution::Fallback((self.fallback)());
        };

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, primary).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {}ms", limit.as_millis())),
            },
            None => primary.await.map_err(|e| e.to_string()),
        };

        match outcome {
            Ok(value) => Resolution::Primary(value),
            Err(error) => {
                warn!(stage = self.stage, %error, "primary failed, using fallback");
                Resolution::Fallback((self.fallback)())
            }
        }
    }
}
