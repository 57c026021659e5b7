//! Adapters implementing the domain ports against concrete backends.

pub mod ai;
pub mod execution;
pub mod feeds;
