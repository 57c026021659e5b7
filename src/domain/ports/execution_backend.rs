//! Execution backend port.

use async_trait::async_trait;

use super::errors::ExecutionError;
use crate::domain::models::Action;

/// Performs a single action and returns its transaction reference.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Execute one action.
    ///
    /// Return [`ExecutionError::ActionRejected`] when only this action
    /// failed and [`ExecutionError::BackendUnavailable`] when the backend
    /// cannot execute anything.
    async fn execute(&self, action: &Action) -> Result<String, ExecutionError>;
}
