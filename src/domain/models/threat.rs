//! Threat assessments and evaluator verdicts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Placeholder token recorded when a threat names no known token.
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Chain assumed when a signal does not name one.
pub const DEFAULT_CHAIN: &str = "ethereum";

/// Threat severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth watching.
    Low,
    /// Moderate exposure.
    Medium,
    /// Severe exposure.
    High,
    /// Act immediately.
    Critical,
}

impl Severity {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Derive severity from free text.
    ///
    /// Keywords are checked in priority order: `critical`/`urgent`, then
    /// `high`/`severe`, then `medium`/`moderate`; anything else is `low`.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has_any(&["critical", "urgent"]) {
            Self::Critical
        } else if has_any(&["high", "severe"]) {
            Self::High
        } else if has_any(&["medium", "moderate"]) {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured assessment that a signal represents a real risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    /// Human-readable summary.
    pub description: String,
    /// Canonical protocol names.
    pub affected_protocols: BTreeSet<String>,
    /// Canonical token symbols, or `unknown`.
    pub affected_tokens: BTreeSet<String>,
    /// Lower-case chain name.
    pub chain: String,
    /// How urgent the threat is.
    pub severity: Severity,
}

impl Threat {
    /// Threat on the default chain with nothing affected yet.
    pub fn new(description: impl Into<String>, severity: Severity) -> Self {
        Self {
            description: description.into(),
            affected_protocols: BTreeSet::new(),
            affected_tokens: BTreeSet::new(),
            chain: DEFAULT_CHAIN.to_string(),
            severity,
        }
    }

    /// Add affected protocols.
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_protocols.extend(protocols.into_iter().map(Into::into));
        self
    }

    /// Add affected tokens.
    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Set the chain.
    pub fn on_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = chain.into();
        self
    }

    /// Whether the token set only holds the placeholder.
    pub fn has_unknown_tokens_only(&self) -> bool {
        self.affected_tokens.len() == 1 && self.affected_tokens.contains(UNKNOWN_TOKEN)
    }
}

/// Outcome of evaluating one signal.
///
/// Exactly one of: benign, a confirmed threat, or an explicit error. A
/// threat verdict always carries its threat and an error never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Not a threat.
    Benign,
    /// A threat with its details.
    Threat {
        /// The detected threat.
        threat: Threat,
    },
    /// Evaluation could not decide.
    Error {
        /// Why evaluation failed.
        message: String,
    },
}

impl Verdict {
    /// Whether this verdict carries a threat.
    pub fn is_threat(&self) -> bool {
        matches!(self, Self::Threat { .. })
    }

    /// The threat, if any.
    pub fn threat(&self) -> Option<&Threat> {
        match self {
            Self::Threat { threat } => Some(threat),
            _ => None,
        }
    }

    /// The error message, if evaluation failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}
