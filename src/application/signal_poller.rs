//! Periodic polling of a signal feed into the coordinator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::workflow_coordinator::WorkflowHandle;
use crate::domain::errors::DomainResult;
use crate::domain::ports::SignalFeed;

/// Why the poller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    /// The feed reported it has nothing more to give.
    Exhausted,
    /// The shutdown watch flipped to `true`.
    Shutdown,
}

/// Polls a [`SignalFeed`] and submits what it yields to the coordinator.
pub struct SignalPoller {
    feed: Arc<dyn SignalFeed>,
    handle: WorkflowHandle,
    interval: Duration,
}

impl SignalPoller {
    /// Poll `feed` every `interval`, submitting through `handle`.
    pub fn new(feed: Arc<dyn SignalFeed>, handle: WorkflowHandle, interval: Duration) -> Self {
        Self {
            feed,
            handle,
            interval,
        }
    }

    /// Poll until the feed is exhausted or `shutdown` flips to `true`.
    ///
    /// Feed errors are logged and polling continues. Returns the number of
    /// signals handed to the coordinator.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> DomainResult<(usize, PollerExit)> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut submitted = 0usize;

        info!(feed = self.feed.name(), interval = ?self.interval, "signal poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(submitted, "signal poller shutting down");
                        return Ok((submitted, PollerExit::Shutdown));
                    }
                    continue;
                }
            }

            match self.feed.poll().await {
                Ok(signals) => {
                    debug!(count = signals.len(), "feed polled");
                    for signal in signals {
                        self.handle.submit_signal(signal).await?;
                        submitted += 1;
                    }
                }
                Err(err) => warn!(feed = self.feed.name(), error = %err, "feed poll failed"),
            }

            if self.feed.is_exhausted() {
                info!(submitted, "signal feed exhausted");
                return Ok((submitted, PollerExit::Exhausted));
            }
        }
    }
}
