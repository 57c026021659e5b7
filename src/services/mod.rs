//! Stage services, the workflow machine and the event bus.

pub mod action_composer;
pub mod action_executor;
pub mod entity_catalog;
pub mod event_bus;
pub mod fallback;
pub mod threat_enricher;
pub mod threat_evaluator;
pub mod workflow_machine;

pub use action_composer::ActionComposer;
pub use action_executor::ActionExecutor;
pub use entity_catalog::EntityCatalog;
pub use event_bus::{CycleOutcome, EventBus, EventBusConfig, SequenceNumber, StateChange};
pub use fallback::{FallbackChain, Resolution};
pub use threat_enricher::ThreatEnricher;
pub use threat_evaluator::ThreatEvaluator;
pub use workflow_machine::{StageInput, Transition, WorkflowMachine};
