//! Signal source port.

use async_trait::async_trait;

use super::errors::FeedError;
use crate::domain::models::Signal;

/// Source of external signals, polled at a caller-chosen cadence.
#[async_trait]
pub trait SignalFeed: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch the signals that arrived since the previous poll.
    async fn poll(&self) -> Result<Vec<Signal>, FeedError>;

    /// Whether the feed will never yield another signal.
    ///
    /// Live feeds keep the default.
    fn is_exhausted(&self) -> bool {
        false
    }
}
