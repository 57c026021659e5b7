//! Remediation planning: delegated plan first, dependency-graph fan-out second.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::entity_catalog::EntityCatalog;
use super::fallback::FallbackChain;
use crate::domain::models::{Action, ComposerConfig, DependencyGraph, Threat};
use crate::domain::ports::{ActionPlanner, AnalystError};

/// Turns a confirmed threat into an ordered list of actions.
pub struct ActionComposer {
    catalog: Arc<EntityCatalog>,
    planner: Option<Arc<dyn ActionPlanner>>,
    planner_timeout: Option<Duration>,
    safe_token: String,
}

impl ActionComposer {
    /// Build a composer, resolving the configured safe token against the catalog.
    pub fn new(catalog: Arc<EntityCatalog>, config: &ComposerConfig) -> Self {
        let safe_token = Self::resolve_safe_token(&catalog, &config.safe_token);
        Self {
            catalog,
            planner: None,
            planner_timeout: None,
            safe_token,
        }
    }

    /// Prefer plans from `planner`, falling back to [`Self::fallback_plan`].
    pub fn with_planner(mut self, planner: Arc<dyn ActionPlanner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Give up on the planner after `timeout`.
    pub fn with_planner_timeout(mut self, timeout: Duration) -> Self {
        self.planner_timeout = Some(timeout);
        self
    }

    /// Token that unaffected positions are swapped into.
    pub fn safe_token(&self) -> &str {
        &self.safe_token
    }

    fn resolve_safe_token(catalog: &EntityCatalog, configured: &str) -> String {
        if let Some(canonical) = catalog.normalize_token(configured) {
            return canonical.to_string();
        }
        match catalog.token_symbols().next() {
            Some(first) => {
                warn!(
                    configured,
                    substitute = first,
                    "safe token not in catalog, substituting first catalog token"
                );
                first.to_string()
            }
            None => {
                warn!(configured, "token catalog is empty, safe token is unvalidated");
                configured.to_string()
            }
        }
    }

    /// Compose the action plan for `threat`. Never fails; an irrecoverable
    /// problem yields an empty plan.
    #[instrument(skip_all, fields(severity = %threat.severity, protocols = threat.affected_protocols.len()))]
    pub async fn compose(&self, threat: &Threat, graph: &DependencyGraph) -> Vec<Action> {
        let threat = self.normalize(threat);

        let primary = self.planner.as_ref().map(|planner| {
            let planner = Arc::clone(planner);
            let threat = &threat;
            async move {
                let plan = planner.propose(threat, graph).await?;
                validate_plan(plan)
            }
        });

        let mut chain = FallbackChain::new("composition", primary, || {
            self.fallback_plan(&threat, graph)
        });
        if let Some(limit) = self.planner_timeout {
            chain = chain.with_timeout(limit);
        }

        let resolution = chain.resolve().await;
        let source = resolution.source();
        let plan = resolution.into_inner();
        info!(source, actions = plan.len(), "action plan composed");
        plan
    }

    /// Canonical names for every affected protocol and token.
    fn normalize(&self, threat: &Threat) -> Threat {
        let mut normalized = threat.clone();
        normalized.affected_protocols = threat
            .affected_protocols
            .iter()
            .map(|p| self.catalog.canonical_protocol(p))
            .collect();
        normalized.affected_tokens = threat
            .affected_tokens
            .iter()
            .map(|t| self.catalog.canonical_token(t))
            .collect();
        normalized
    }

    /// Deterministic fan-out over the dependency graph.
    ///
    /// Affected tokens are withdrawn; every other dependent token is swapped
    /// into the safe token. Protocols absent from the graph contribute nothing.
    /// Severity does not change the plan, and `revoke` only comes from a
    /// delegated planner.
    pub fn fallback_plan(&self, threat: &Threat, graph: &DependencyGraph) -> Vec<Action> {
        let mut plan = Vec::new();
        for protocol in &threat.affected_protocols {
            let Some(tokens) = graph.get(protocol) else {
                debug!(protocol = %protocol, "no dependency graph entry");
                continue;
            };
            for token in tokens {
                let action = if threat.affected_tokens.contains(token) {
                    Action::withdraw(protocol.as_str(), token.as_str())
                } else {
                    Action::swap(protocol.as_str(), token.as_str(), self.safe_token.as_str())
                };
                plan.push(action);
            }
        }
        plan
    }
}

/// Empty or structurally broken proposals count as backend failures.
fn validate_plan(plan: Vec<Action>) -> Result<Vec<Action>, AnalystError> {
    if plan.is_empty() {
        return Err(AnalystError::MalformedResponse(
            "planner proposed no actions".to_string(),
        ));
    }
    if let Some(bad) = plan.iter().find(|a| !a.is_well_formed()) {
        return Err(AnalystError::MalformedResponse(format!(
            "planner proposed malformed action: {bad}"
        )));
    }
    Ok(plan)
}
