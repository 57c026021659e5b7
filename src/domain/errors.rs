//! Domain errors for the Shieldwall pipeline.

use thiserror::Error;

use super::models::{Stage, WorkflowState};

/// Domain-level errors that can occur in the Shieldwall pipeline.
///
/// Only these contract violations move the workflow to `failed`;
/// collaborator and catalog problems are absorbed inside their stage.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An event the current state does not accept.
    #[error("Invalid transition: {event} is not accepted in state {state}")]
    InvalidTransition {
        /// State the machine was in.
        state: WorkflowState,
        /// Name of the rejected event.
        event: &'static str,
    },

    /// A stage started without the context it needs.
    #[error("Missing {input} for {stage} stage")]
    MissingInput {
        /// Stage that was about to run.
        stage: Stage,
        /// Context field that was empty.
        input: &'static str,
    },

    /// A stage ran past its limit.
    #[error("{stage} stage timed out after {millis}ms")]
    StageTimeout {
        /// Stage that timed out.
        stage: Stage,
        /// Limit that was exceeded.
        millis: u64,
    },

    /// A stage rejected its input.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The coordinator task has exited.
    #[error("Coordinator is not running")]
    CoordinatorStopped,
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
