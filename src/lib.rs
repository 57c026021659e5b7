//! Shieldwall - signal-driven protection for DeFi positions
//!
//! Shieldwall watches external signals (social posts), decides whether they
//! report a threat to a monitored protocol, plans protective actions from the
//! protocol/token dependency graph and executes them one by one.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): evaluation, enrichment, composition,
//!   execution and the workflow state machine
//! - **Application Layer** (`application`): coordinator runtime, signal
//!   poller and wiring
//! - **Adapters** (`adapters`): AI backends, execution backends, feeds
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   catalog loading
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use shieldwall::application::Bootstrap;
//! use shieldwall::domain::models::{Config, Signal};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handle = Bootstrap::new(Config::default()).coordinator().spawn();
//!     handle.submit_signal(Signal::tweet("Aave exploit in progress")).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Bootstrap, Pipeline, WorkflowCoordinator, WorkflowHandle};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Action, ActionType, Config, ExecutionResult, Severity, Signal, Threat, Verdict,
    WorkflowState,
};
pub use domain::ports::{ActionPlanner, ExecutionBackend, SignalFeed, ThreatAnalyst};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ActionComposer, ActionExecutor, EntityCatalog, ThreatEvaluator};
