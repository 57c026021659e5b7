//! Workflow state machine types.
//!
//! The coordinator owns a single [`WorkflowContext`] and moves through the
//! states below one signal at a time:
//!
//! ```text
//! Idle → Evaluating → Processing → Composing → Executing → Completed → Idle
//!            ↘ Idle (benign)
//!   any stage ↘ Failed ──retry──→ Evaluating
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::action::{Action, ExecutionResult};
use super::signal::Signal;
use super::threat::{Threat, Verdict};

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Waiting for a signal.
    #[default]
    Idle,
    /// Evaluation stage running.
    Evaluating,
    /// Enrichment stage running.
    Processing,
    /// Composition stage running.
    Composing,
    /// Execution stage running.
    Executing,
    /// Cycle finished; returns to idle after the completion delay.
    Completed,
    /// A stage failed; waiting for a retry.
    Failed,
}

impl WorkflowState {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Evaluating => "evaluating",
            Self::Processing => "processing",
            Self::Composing => "composing",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// States in which an asynchronous stage is in flight.
    pub fn is_busy(&self) -> bool {
        self.stage().is_some()
    }

    /// The stage that runs while in this state, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Evaluating => Some(Stage::Evaluation),
            Self::Processing => Some(Stage::Enrichment),
            Self::Composing => Some(Stage::Composition),
            Self::Executing => Some(Stage::Execution),
            Self::Idle | Self::Completed | Self::Failed => None,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four asynchronous units of work sequenced by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Signal to verdict.
    Evaluation,
    /// Threat validation and expansion.
    Enrichment,
    /// Threat to action plan.
    Composition,
    /// Action plan to results.
    Execution,
}

impl Stage {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evaluation => "evaluation",
            Self::Enrichment => "enrichment",
            Self::Composition => "composition",
            Self::Execution => "execution",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that drive the machine.
///
/// `*Settled` events carry a stage's successful output; `StageFailed`
/// covers a stage that raised or timed out.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A new signal arrived.
    SignalReceived(Signal),
    /// Evaluation finished.
    EvaluationSettled(Verdict),
    /// Enrichment finished.
    EnrichmentSettled(Threat),
    /// Composition finished.
    CompositionSettled(Vec<Action>),
    /// Execution finished.
    ExecutionSettled(Vec<ExecutionResult>),
    /// A stage raised or timed out.
    StageFailed {
        /// Stage that failed.
        stage: Stage,
        /// What went wrong.
        message: String,
    },
    /// The completion delay elapsed.
    CompletionTimeout,
    /// Re-run evaluation on the stored signal.
    Retry,
}

impl WorkflowEvent {
    /// Short name used in logs and transition records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignalReceived(_) => "signal_received",
            Self::EvaluationSettled(_) => "evaluation_settled",
            Self::EnrichmentSettled(_) => "enrichment_settled",
            Self::CompositionSettled(_) => "composition_settled",
            Self::ExecutionSettled(_) => "execution_settled",
            Self::StageFailed { .. } => "stage_failed",
            Self::CompletionTimeout => "completion_timeout",
            Self::Retry => "retry",
        }
    }
}

/// Why the workflow entered `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// What went wrong.
    pub message: String,
    /// When the failure was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl StageFailure {
    /// Failure stamped with the current time.
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// The single mutable aggregate of the pipeline.
///
/// Fields are cleared, never removed, between cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowContext {
    /// Every signal received, oldest first, capped at the history limit.
    pub signal_history: Vec<Signal>,
    /// Signal of the active cycle.
    pub current_signal: Option<Signal>,
    /// Threat of the active cycle.
    pub detected_threat: Option<Threat>,
    /// Plan of the active cycle.
    pub action_plan: Vec<Action>,
    /// Results of the active cycle.
    pub execution_results: Vec<ExecutionResult>,
    /// Most recent stage failure.
    pub last_error: Option<StageFailure>,
    /// Signals accepted while a cycle was in flight, oldest first.
    pub queued_signals: VecDeque<Signal>,
}

impl WorkflowContext {
    /// Record a signal, dropping the oldest entries beyond `limit`.
    pub fn record_signal(&mut self, signal: Signal, limit: usize) {
        self.signal_history.push(signal);
        if self.signal_history.len() > limit {
            let excess = self.signal_history.len() - limit;
            self.signal_history.drain(..excess);
        }
    }

    /// Clear per-cycle fields on return to idle.
    pub fn reset_cycle(&mut self) {
        self.current_signal = None;
        self.detected_threat = None;
        self.action_plan.clear();
        self.execution_results.clear();
    }
}

/// Point-in-time view published to observers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowSnapshot {
    /// Machine state.
    pub state: WorkflowState,
    /// Accumulated context.
    pub context: WorkflowContext,
}
