//! Coordinator runtime, feed polling and startup wiring.

pub mod bootstrap;
pub mod signal_poller;
pub mod workflow_coordinator;

pub use bootstrap::Bootstrap;
pub use signal_poller::SignalPoller;
pub use workflow_coordinator::{Pipeline, Preview, WorkflowCoordinator, WorkflowHandle};
