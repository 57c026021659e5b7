//! Delegated threat evaluation port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::AnalystError;
use crate::domain::models::{DependencyGraph, Severity};

/// Catalog summary handed to the AI backend as context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogContext {
    /// Canonical protocol names.
    pub protocols: Vec<String>,
    /// Canonical token symbols.
    pub tokens: Vec<String>,
    /// Protocol to dependent tokens.
    pub dependency_graph: DependencyGraph,
}

/// Request to assess a single signal.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRequest {
    /// Signal text.
    pub content: String,
    /// Catalog the verdict should refer to.
    pub catalog: CatalogContext,
}

/// Threat fields as proposed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatDetails {
    /// Summary of the threat.
    #[serde(default)]
    pub description: Option<String>,
    /// Protocol names as the backend wrote them.
    #[serde(default)]
    pub affected_protocols: Vec<String>,
    /// Token symbols as the backend wrote them.
    #[serde(default)]
    pub affected_tokens: Vec<String>,
    /// Chain the threat is on.
    #[serde(default)]
    pub chain: Option<String>,
    /// Severity, if the backend judged it.
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Structured verdict returned by the backend.
///
/// This mirrors the wire schema, so `threat_details` is optional; the
/// evaluator rejects `is_threat: true` without details as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystVerdict {
    /// Whether the signal describes a threat.
    pub is_threat: bool,
    /// Required when `is_threat` is true.
    #[serde(default)]
    pub threat_details: Option<ThreatDetails>,
}

/// AI backend that classifies signals.
#[async_trait]
pub trait ThreatAnalyst: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Assess one signal against the catalog.
    async fn assess(&self, request: &AssessmentRequest) -> Result<AnalystVerdict, AnalystError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_format() {
        let json = r#"{
            "isThreat": true,
            "threatDetails": {
                "affectedProtocols": ["Aave"],
                "affectedTokens": ["DAI"],
                "severity": "high"
            }
        }"#;
        let verdict: AnalystVerdict = serde_json::from_str(json).unwrap();
        assert!(verdict.is_threat);
        let details = verdict.threat_details.unwrap();
        assert_eq!(details.affected_protocols, vec!["Aave"]);
        assert_eq!(details.severity, Some(Severity::High));
        assert!(details.chain.is_none());
    }

    #[test]
    fn test_benign_verdict_without_details() {
        let verdict: AnalystVerdict = serde_json::from_str(r#"{"isThreat": false}"#).unwrap();
        assert!(!verdict.is_threat);
        assert!(verdict.threat_details.is_none());
    }
}
