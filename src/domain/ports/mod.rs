//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - ThreatAnalyst: delegated AI threat evaluation
//! - ActionPlanner: delegated AI remediation planning
//! - ExecutionBackend: wallet/transaction layer
//! - SignalFeed: external signal source
//!
//! These traits keep the pipeline independent of concrete backends.

pub mod action_planner;
pub mod errors;
pub mod execution_backend;
pub mod signal_feed;
pub mod threat_analyst;

pub use action_planner::ActionPlanner;
pub use errors::{AnalystError, ExecutionError, FeedError};
pub use execution_backend::ExecutionBackend;
pub use signal_feed::SignalFeed;
pub use threat_analyst::{
    AnalystVerdict, AssessmentRequest, CatalogContext, ThreatAnalyst, ThreatDetails,
};
