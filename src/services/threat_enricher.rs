//! Threat enrichment between evaluation and composition.
//!
//! With the default policy the threat passes through untouched. Severity
//! escalation and dependency expansion are opt-in.

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::threat::UNKNOWN_TOKEN;
use crate::domain::models::{DependencyGraph, EnrichmentConfig, Severity, Threat};

/// Validates and optionally expands a threat between evaluation and composition.
#[derive(Debug, Clone, Default)]
pub struct ThreatEnricher {
    policy: EnrichmentConfig,
}

impl ThreatEnricher {
    /// Enricher applying `policy`.
    pub fn new(policy: EnrichmentConfig) -> Self {
        Self { policy }
    }

    /// Apply the configured policy to a detected threat.
    pub fn enrich(&self, mut threat: Threat, graph: &DependencyGraph) -> DomainResult<Threat> {
        if threat.affected_tokens.is_empty() {
            return Err(DomainError::ValidationFailed(
                "threat names no affected token".to_string(),
            ));
        }
        if threat.chain.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "threat names no chain".to_string(),
            ));
        }

        if self.policy.escalate_medium_to_high && threat.severity == Severity::Medium {
            debug!("escalating medium threat to high");
            threat.severity = Severity::High;
        }

        if self.policy.expand_dependent_tokens {
            expand_tokens(&mut threat, graph);
        }

        Ok(threat)
    }
}

fn expand_tokens(threat: &mut Threat, graph: &DependencyGraph) {
    let dependents: Vec<String> = threat
        .affected_protocols
        .iter()
        .filter_map(|protocol| graph.get(protocol))
        .flatten()
        .cloned()
        .collect();
    if dependents.is_empty() {
        return;
    }
    debug!(added = dependents.len(), "expanding affected tokens");
    threat.affected_tokens.extend(dependents);
    threat.affected_tokens.remove(UNKNOWN_TOKEN);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> DependencyGraph {
        DependencyGraph::from([(
            "Uniswap".to_string(),
            vec!["USDC".to_string(), "USDT".to_string()],
        )])
    }

    fn threat() -> Threat {
        Threat::new("exploit", Severity::Medium)
            .with_protocols(["Uniswap"])
            .with_tokens([UNKNOWN_TOKEN])
    }

    #[test]
    fn test_default_policy_is_passthrough() {
        let enricher = ThreatEnricher::default();
        assert_eq!(enricher.enrich(threat(), &graph()).unwrap(), threat());
    }

    #[test]
    fn test_escalation_policy() {
        let enricher = ThreatEnricher::new(EnrichmentConfig {
            escalate_medium_to_high: true,
            ..EnrichmentConfig::default()
        });
        let enriched = enricher.enrich(threat(), &graph()).unwrap();
        assert_eq!(enriched.severity, Severity::High);

        let low = Threat::new("x", Severity::Low).with_tokens(["DAI"]);
        assert_eq!(enricher.enrich(low, &graph()).unwrap().severity, Severity::Low);
    }

    #[test]
    fn test_dependency_expansion_replaces_unknown() {
        let enricher = ThreatEnricher::new(EnrichmentConfig {
            expand_dependent_tokens: true,
            ..EnrichmentConfig::default()
        });
        let enriched = enricher.enrich(threat(), &graph()).unwrap();
        assert!(enriched.affected_tokens.contains("USDC"));
        assert!(enriched.affected_tokens.contains("USDT"));
        assert!(!enriched.affected_tokens.contains(UNKNOWN_TOKEN));
    }

    #[test]
    fn test_expansion_keeps_unknown_without_graph_entry() {
        let enricher = ThreatEnricher::new(EnrichmentConfig {
            expand_dependent_tokens: true,
            ..EnrichmentConfig::default()
        });
        let enriched = enricher
            .enrich(threat(), &DependencyGraph::new())
            .unwrap();
        assert!(enriched.has_unknown_tokens_only());
    }

    #[test]
    fn test_threat_without_tokens_rejected() {
        let bare = Threat::new("exploit", Severity::High).with_protocols(["Uniswap"]);
        let err = ThreatEnricher::default().enrich(bare, &graph()).unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
