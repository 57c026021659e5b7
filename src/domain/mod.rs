//! Domain layer for the Shieldwall pipeline
//!
//! Core models, port traits and domain errors. Nothing here performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
