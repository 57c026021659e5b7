//! Signal feed adapters.

pub mod scripted;

pub use scripted::{FeedRecord, ScriptedSignalFeed};
