//! Configuration management infrastructure
//!
//! Layered figment loading (defaults, project YAML, local YAML, environment)
//! followed by validation of the merged result.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
