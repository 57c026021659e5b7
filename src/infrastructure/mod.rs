//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging (tracing-subscriber, tracing-appender)
//! - Static catalog loading

pub mod catalog;
pub mod config;
pub mod logging;
