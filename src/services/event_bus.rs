//! Broadcast of workflow state changes.
//!
//! Every transition is published with a monotonically increasing sequence
//! number. Slow subscribers lag and lose old records; publishing never
//! blocks the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{ExecutionResult, StageFailure, WorkflowState};

/// Monotonically increasing sequence number assigned by [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a cycle ended, captured at the moment it ended.
///
/// The completion timer and queued signals overwrite the context soon
/// after, so observers read outcomes from here rather than from a later
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Entered `completed`: one result per planned action.
    Executed {
        /// Results in plan order.
        results: Vec<ExecutionResult>,
    },
    /// Entered `failed`.
    Failed {
        /// The recorded failure.
        failure: StageFailure,
    },
}

/// One observed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Position in the bus's publish order.
    pub sequence: SequenceNumber,
    /// State before the transition.
    pub from: WorkflowState,
    /// State after the transition.
    pub to: WorkflowState,
    /// Name of the event that caused the transition.
    pub trigger: String,
    /// Signal being processed when the transition happened.
    pub signal_id: Option<Uuid>,
    /// Set on transitions into `completed` or `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CycleOutcome>,
    /// When the transition was published.
    pub timestamp: DateTime<Utc>,
}

/// Broadcast channel sizing.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Records kept for slow subscribers before they lag.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Sequenced broadcast of [`StateChange`] records.
pub struct EventBus {
    sender: broadcast::Sender<StateChange>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Create a bus with the given channel capacity (at least 1).
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish a transition and return the record as sent.
    pub fn publish(
        &self,
        from: WorkflowState,
        to: WorkflowState,
        trigger: &str,
        signal_id: Option<Uuid>,
        outcome: Option<CycleOutcome>,
    ) -> StateChange {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let change = StateChange {
            sequence: SequenceNumber(seq),
            from,
            to,
            trigger: trigger.to_string(),
            signal_id,
            outcome,
            timestamp: Utc::now(),
        };
        // No subscribers is fine.
        let _ = self.sender.send(change.clone());
        change
    }

    /// Receive every record published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.sender.subscribe()
    }

    /// Next sequence number to be assigned.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Live subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}
