//! Execution backend adapters.

pub mod simulated;

pub use simulated::SimulatedExecutionBackend;
