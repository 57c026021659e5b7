//! Domain data types.

pub mod action;
pub mod catalog;
pub mod config;
pub mod signal;
pub mod threat;
pub mod workflow_state;

pub use action::{Action, ActionType, ExecutionOutcome, ExecutionResult, ExecutionStatus, ParamValue};
pub use catalog::{DependencyGraph, DependencyRecord, ProtocolRecord, SwapFunction, TokenRecord};
pub use config::{
    AiConfig, CatalogConfig, ComposerConfig, Config, EnrichmentConfig, EvaluatorConfig,
    ExecutorConfig, FeedConfig, LoggingConfig, WorkflowConfig,
};
pub use signal::{Signal, SignalSource};
pub use threat::{Severity, Threat, Verdict};
pub use workflow_state::{
    Stage, StageFailure, WorkflowContext, WorkflowEvent, WorkflowSnapshot, WorkflowState,
};
