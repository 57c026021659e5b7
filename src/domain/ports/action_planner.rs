//! Delegated remediation planning port.

use async_trait::async_trait;

use super::errors::AnalystError;
use crate::domain::models::{Action, DependencyGraph, Threat};

/// AI backend that proposes remediation actions for a confirmed threat.
#[async_trait]
pub trait ActionPlanner: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Propose an ordered action list. An empty list counts as no proposal.
    async fn propose(
        &self,
        threat: &Threat,
        graph: &DependencyGraph,
    ) -> Result<Vec<Action>, AnalystError>;
}
