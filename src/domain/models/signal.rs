//! External security signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a signal was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Twitter / X post.
    Twitter,
    /// Discord message.
    Discord,
    /// Any other source.
    Other,
}

impl SignalSource {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Discord => "discord",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of external information that may indicate a threat.
///
/// Signals are immutable once created; the coordinator consumes each one
/// in exactly one workflow cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique id, assigned on creation.
    pub id: Uuid,
    /// Where the signal came from.
    pub source: SignalSource,
    /// Raw text.
    pub content: String,
    /// When the signal was created.
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Create a signal observed now.
    pub fn new(source: SignalSource, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Convenience constructor for the default social feed.
    pub fn tweet(content: impl Into<String>) -> Self {
        Self::new(SignalSource::Twitter, content)
    }

    /// Lower-cased content used by the keyword heuristics.
    pub fn normalized_content(&self) -> String {
        self.content.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serde() {
        let json = serde_json::to_string(&SignalSource::Discord).unwrap();
        assert_eq!(json, "\"discord\"");
        let parsed: SignalSource = serde_json::from_str("\"twitter\"").unwrap();
        assert_eq!(parsed, SignalSource::Twitter);
    }

    #[test]
    fn test_tweet_defaults() {
        let signal = Signal::tweet("Aave EXPLOIT");
        assert_eq!(signal.source, SignalSource::Twitter);
        assert_eq!(signal.normalized_content(), "aave exploit");
    }
}
