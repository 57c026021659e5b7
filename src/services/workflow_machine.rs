//! Pure workflow state machine.
//!
//! Holds the state and context and applies events according to the
//! transition table. No I/O and no async; the coordinator runs the stages
//! and feeds their outcomes back in as events.

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Action, Signal, Stage, StageFailure, Threat, Verdict, WorkflowContext, WorkflowEvent,
    WorkflowSnapshot, WorkflowState,
};

/// Effect of one accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Moved {
        /// State before the event.
        from: WorkflowState,
        /// State after the event.
        to: WorkflowState,
    },
    /// A signal arrived mid-cycle and was queued; state unchanged.
    Queued {
        /// Signals now waiting, including this one.
        pending: usize,
    },
}

/// Read-only input for the stage that runs in the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    /// Signal to evaluate.
    Evaluate(Signal),
    /// Threat to enrich.
    Enrich(Threat),
    /// Enriched threat to compose a plan for.
    Compose(Threat),
    /// Plan to execute.
    Execute(Vec<Action>),
}

/// Pure workflow state machine: no I/O, no clocks.
#[derive(Debug, Clone)]
pub struct WorkflowMachine {
    state: WorkflowState,
    context: WorkflowContext,
    history_limit: usize,
}

impl WorkflowMachine {
    /// Machine in `idle`, keeping at most `history_limit` signals.
    pub fn new(history_limit: usize) -> Self {
        Self {
            state: WorkflowState::Idle,
            context: WorkflowContext::default(),
            history_limit: history_limit.max(1),
        }
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Accumulated context.
    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    /// Copy of state and context.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            state: self.state,
            context: self.context.clone(),
        }
    }

    /// Whether signals are waiting behind the active cycle.
    pub fn has_queued(&self) -> bool {
        !self.context.queued_signals.is_empty()
    }

    /// Apply one event.
    ///
    /// Pairs outside the transition table are rejected and leave state and
    /// context untouched.
    pub fn apply(&mut self, event: WorkflowEvent) -> DomainResult<Transition> {
        use WorkflowEvent as E;
        use WorkflowState as S;

        let from = self.state;
        let event_name = event.name();
        let to = match (from, event) {
            (S::Idle, E::SignalReceived(signal)) => {
                self.context.record_signal(signal.clone(), self.history_limit);
                self.context.current_signal = Some(signal);
                S::Evaluating
            }
            (_, E::SignalReceived(signal)) => {
                self.context.record_signal(signal.clone(), self.history_limit);
                self.context.queued_signals.push_back(signal);
                let pending = self.context.queued_signals.len();
                debug!(state = %from, pending, "signal queued behind active cycle");
                return Ok(Transition::Queued { pending });
            }

            (S::Evaluating, E::EvaluationSettled(verdict)) => match verdict {
                Verdict::Threat { threat } => {
                    self.context.detected_threat = Some(threat);
                    S::Processing
                }
                Verdict::Benign => {
                    self.context.reset_cycle();
                    S::Idle
                }
                Verdict::Error { message } => {
                    self.context.last_error = Some(StageFailure::new(Stage::Evaluation, message));
                    S::Failed
                }
            },
            (S::Processing, E::EnrichmentSettled(threat)) => {
                self.context.detected_threat = Some(threat);
                S::Composing
            }
            (S::Composing, E::CompositionSettled(plan)) => {
                self.context.action_plan = plan;
                S::Executing
            }
            (S::Executing, E::ExecutionSettled(results)) => {
                self.context.execution_results = results;
                S::Completed
            }
            (state, E::StageFailed { stage, message }) if state.stage() == Some(stage) => {
                self.context.last_error = Some(StageFailure::new(stage, message));
                S::Failed
            }
            (S::Completed, E::CompletionTimeout) => {
                self.context.reset_cycle();
                S::Idle
            }
            (S::Failed, E::Retry) if self.context.current_signal.is_some() => S::Evaluating,

            (state, _) => {
                return Err(DomainError::InvalidTransition {
                    state,
                    event: event_name,
                });
            }
        };

        self.state = to;
        Ok(Transition::Moved { from, to })
    }

    /// Start the oldest queued signal once the machine is idle again.
    ///
    /// The signal is already in the history, so it is not recorded twice.
    pub fn begin_queued(&mut self) -> Option<Transition> {
        if self.state != WorkflowState::Idle {
            return None;
        }
        let signal = self.context.queued_signals.pop_front()?;
        self.context.current_signal = Some(signal);
        self.state = WorkflowState::Evaluating;
        Some(Transition::Moved {
            from: WorkflowState::Idle,
            to: WorkflowState::Evaluating,
        })
    }

    /// Input for the stage owned by the current state.
    ///
    /// `None` when no stage runs in this state. A missing input is a
    /// contract violation reported as [`DomainError::MissingInput`].
    pub fn stage_input(&self) -> Option<DomainResult<StageInput>> {
        let stage = self.state.stage()?;
        let missing = |input| DomainError::MissingInput { stage, input };
        let threat = || {
            self.context
                .detected_threat
                .clone()
                .ok_or_else(|| missing("detected threat"))
        };

        Some(match stage {
            Stage::Evaluation => self
                .context
                .current_signal
                .clone()
                .map(StageInput::Evaluate)
                .ok_or_else(|| missing("current signal")),
            Stage::Enrichment => threat().map(StageInput::Enrich),
            Stage::Composition => threat().map(StageInput::Compose),
            Stage::Execution => Ok(StageInput::Execute(self.context.action_plan.clone())),
        })
    }
}
