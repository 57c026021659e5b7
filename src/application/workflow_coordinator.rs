//! Workflow coordinator.
//!
//! Owns the [`WorkflowMachine`] and runs one stage at a time for the
//! current signal. Two ways to drive it:
//!
//! - [`WorkflowCoordinator::dispatch`] applies an event and runs stages
//!   inline until the machine rests (idle, completed or failed).
//! - [`WorkflowCoordinator::spawn`] moves the coordinator onto a tokio task
//!   fed by a bounded command queue and returns a [`WorkflowHandle`]. The
//!   task keeps receiving commands while a stage is in flight and fires the
//!   completed → idle timer on its own.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Action, Signal, Threat, Verdict, WorkflowConfig, WorkflowEvent, WorkflowSnapshot,
    WorkflowState,
};
use crate::services::event_bus::{CycleOutcome, EventBus, StateChange};
use crate::services::workflow_machine::{StageInput, Transition, WorkflowMachine};
use crate::services::{
    ActionComposer, ActionExecutor, EntityCatalog, ThreatEnricher, ThreatEvaluator,
};

/// The four stage services plus the catalog they share.
pub struct Pipeline {
    /// Shared entity catalog; its dependency graph feeds enrichment and composition.
    pub catalog: Arc<EntityCatalog>,
    /// Evaluation stage.
    pub evaluator: ThreatEvaluator,
    /// Enrichment stage.
    pub enricher: ThreatEnricher,
    /// Composition stage.
    pub composer: ActionComposer,
    /// Execution stage.
    pub executor: ActionExecutor,
}

/// Result of evaluating, enriching and composing one signal without
/// executing anything.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Preview {
    /// Evaluator output.
    pub verdict: Verdict,
    /// Threat after enrichment, when the verdict was a threat.
    pub enriched: Option<Threat>,
    /// Plan that would be executed.
    pub plan: Vec<Action>,
}

impl Pipeline {
    /// Run the stage for `input` and report its outcome as an event.
    async fn run_stage(&self, input: StageInput) -> DomainResult<WorkflowEvent> {
        let graph = self.catalog.dependency_graph();
        Ok(match input {
            StageInput::Evaluate(signal) => {
                WorkflowEvent::EvaluationSettled(self.evaluator.evaluate(&signal).await)
            }
            StageInput::Enrich(threat) => {
                WorkflowEvent::EnrichmentSettled(self.enricher.enrich(threat, graph)?)
            }
            StageInput::Compose(threat) => {
                WorkflowEvent::CompositionSettled(self.composer.compose(&threat, graph).await)
            }
            StageInput::Execute(plan) => {
                WorkflowEvent::ExecutionSettled(self.executor.execute_all(&plan).await)
            }
        })
    }

    /// Dry run of the first three stages.
    pub async fn preview(&self, signal: &Signal) -> DomainResult<Preview> {
        let verdict = self.evaluator.evaluate(signal).await;
        let Some(threat) = verdict.threat().cloned() else {
            return Ok(Preview {
                verdict,
                enriched: None,
                plan: Vec::new(),
            });
        };
        let graph = self.catalog.dependency_graph();
        let enriched = self.enricher.enrich(threat, graph)?;
        let plan = self.composer.compose(&enriched, graph).await;
        Ok(Preview {
            verdict,
            enriched: Some(enriched),
            plan,
        })
    }
}

/// Commands accepted by a spawned coordinator.
#[derive(Debug)]
enum Command {
    Signal(Signal),
    Retry,
    Flush(oneshot::Sender<()>),
    Shutdown,
}

type StageFuture = BoxFuture<'static, WorkflowEvent>;

/// Runs the stage services for one workflow instance.
pub struct WorkflowCoordinator {
    machine: WorkflowMachine,
    pipeline: Arc<Pipeline>,
    events: Arc<EventBus>,
    config: WorkflowConfig,
    snapshot_tx: watch::Sender<WorkflowSnapshot>,
}

impl WorkflowCoordinator {
    /// Coordinator in `idle` with an empty context.
    pub fn new(pipeline: Arc<Pipeline>, events: Arc<EventBus>, config: WorkflowConfig) -> Self {
        let machine = WorkflowMachine::new(config.history_limit);
        let (snapshot_tx, _) = watch::channel(machine.snapshot());
        Self {
            machine,
            pipeline,
            events,
            config,
            snapshot_tx,
        }
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        self.machine.state()
    }

    /// Copy of the current state and context.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.machine.snapshot()
    }

    /// Receive every transition published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Apply `event`, then run stages inline until the machine rests.
    ///
    /// Returns the transition caused by `event` itself. The completion
    /// timer is not armed in this mode; send
    /// [`WorkflowEvent::CompletionTimeout`] to leave `completed`.
    pub async fn dispatch(&mut self, event: WorkflowEvent) -> DomainResult<Transition> {
        let transition = self.apply(event)?;
        while let Some(stage) = self.next_stage() {
            let outcome = stage.await;
            self.apply(outcome)?;
        }
        Ok(transition)
    }

    /// Move the coordinator onto its own task.
    pub fn spawn(self) -> WorkflowHandle {
        let (commands, inbox) = mpsc::channel(self.config.queue_capacity.max(1));
        let handle = WorkflowHandle {
            commands,
            snapshots: self.snapshot_tx.subscribe(),
            events: Arc::clone(&self.events),
        };
        tokio::spawn(self.run(inbox));
        handle
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        info!(
            completion_delay_ms = self.config.completion_delay_ms,
            stage_timeout_ms = self.config.stage_timeout_ms,
            "workflow coordinator started"
        );
        let mut in_flight: Option<StageFuture> = None;
        let mut completion: Option<std::pin::Pin<Box<Sleep>>> = None;

        loop {
            if in_flight.is_none() {
                in_flight = self.next_stage();
            }
            match self.machine.state() {
                WorkflowState::Completed if completion.is_none() => {
                    completion = Some(Box::pin(sleep(self.config.completion_delay())));
                }
                WorkflowState::Completed => {}
                _ => completion = None,
            }

            tokio::select! {
                command = inbox.recv() => match command {
                    Some(Command::Signal(signal)) => {
                        let _ = self.apply(WorkflowEvent::SignalReceived(signal));
                    }
                    Some(Command::Retry) => {
                        let _ = self.apply(WorkflowEvent::Retry);
                    }
                    Some(Command::Flush(ack)) => {
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                outcome = poll_stage(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    let _ = self.apply(outcome);
                }
                () = poll_timer(&mut completion), if completion.is_some() => {
                    completion = None;
                    let _ = self.apply(WorkflowEvent::CompletionTimeout);
                }
            }
        }

        info!(state = %self.machine.state(), "workflow coordinator stopped");
    }

    /// Apply one event, publishing the transition and a fresh snapshot.
    #[instrument(skip_all, fields(event = event.name(), state = %self.machine.state()))]
    fn apply(&mut self, event: WorkflowEvent) -> DomainResult<Transition> {
        let trigger = event.name();
        let before = self.machine.context().current_signal.as_ref().map(|s| s.id);
        let result = self.machine.apply(event);

        match &result {
            Ok(transition) => self.publish(*transition, trigger, before),
            Err(err) => warn!(error = %err, "event rejected"),
        }
        result
    }

    fn publish(&self, transition: Transition, trigger: &str, before: Option<uuid::Uuid>) {
        match transition {
            Transition::Moved { from, to } => {
                let signal_id = self
                    .machine
                    .context()
                    .current_signal
                    .as_ref()
                    .map(|s| s.id)
                    .or(before);
                let context = self.machine.context();
                let outcome = match to {
                    WorkflowState::Completed => Some(CycleOutcome::Executed {
                        results: context.execution_results.clone(),
                    }),
                    WorkflowState::Failed => context.last_error.clone().map(|failure| {
                        warn!(stage = %failure.stage, error = %failure.message, "workflow failed");
                        CycleOutcome::Failed { failure }
                    }),
                    _ => None,
                };
                info!(from = %from, to = %to, trigger, "workflow transition");
                self.events.publish(from, to, trigger, signal_id, outcome);
            }
            Transition::Queued { pending } => {
                info!(pending, "signal queued behind active cycle");
            }
        }
        self.snapshot_tx.send_replace(self.machine.snapshot());
    }

    /// Start the stage owned by the current state, beginning a queued
    /// signal first when idle.
    fn next_stage(&mut self) -> Option<StageFuture> {
        if let Some(transition) = self.machine.begin_queued() {
            let signal = self.machine.context().current_signal.as_ref().map(|s| s.id);
            self.publish(transition, "queued_signal", signal);
        }

        let stage = self.machine.state().stage()?;
        let input = match self.machine.stage_input()? {
            Ok(input) => input,
            Err(err) => {
                let _ = self.apply(WorkflowEvent::StageFailed {
                    stage,
                    message: err.to_string(),
                });
                return None;
            }
        };

        debug!(%stage, "starting stage");
        let pipeline = Arc::clone(&self.pipeline);
        // No stage limit for execution: the executor bounds each action and
        // settles with one result per action.
        let limit = match &input {
            StageInput::Execute(_) => None,
            _ => Some(self.config.stage_timeout()),
        };
        Some(Box::pin(async move {
            let run = pipeline.run_stage(input);
            let settled = match limit {
                Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| limit),
                None => Ok(run.await),
            };
            match settled {
                Ok(Ok(event)) => event,
                Ok(Err(err)) => WorkflowEvent::StageFailed {
                    stage,
                    message: err.to_string(),
                },
                Err(limit) => WorkflowEvent::StageFailed {
                    stage,
                    message: DomainError::StageTimeout {
                        stage,
                        millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    }
                    .to_string(),
                },
            }
        }))
    }
}

async fn poll_stage(stage: &mut Option<StageFuture>) -> WorkflowEvent {
    match stage {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn poll_timer(timer: &mut Option<std::pin::Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

/// Cloneable front door to a spawned coordinator.
#[derive(Clone)]
pub struct WorkflowHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<WorkflowSnapshot>,
    events: Arc<EventBus>,
}

impl WorkflowHandle {
    /// Queue a signal. Waits while the command queue is full.
    pub async fn submit_signal(&self, signal: Signal) -> DomainResult<()> {
        self.send(Command::Signal(signal)).await
    }

    /// Ask a failed workflow to re-run evaluation on its stored signal.
    pub async fn retry(&self) -> DomainResult<()> {
        self.send(Command::Retry).await
    }

    /// Wait until every command sent before this call has been applied.
    pub async fn flush(&self) -> DomainResult<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Flush(ack)).await?;
        done.await.map_err(|_| DomainError::CoordinatorStopped)
    }

    /// Stop the coordinator and wait for its task to exit.
    pub async fn shutdown(&self) -> DomainResult<()> {
        self.send(Command::Shutdown).await?;
        let mut snapshots = self.snapshots.clone();
        while snapshots.changed().await.is_ok() {}
        Ok(())
    }

    /// Receive every transition published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.snapshots.borrow().clone()
    }

    /// State of the latest snapshot.
    pub fn state(&self) -> WorkflowState {
        self.snapshots.borrow().state
    }

    /// Receiver that observes every snapshot update.
    pub fn watch(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_until<F>(&self, mut predicate: F) -> DomainResult<WorkflowSnapshot>
    where
        F: FnMut(&WorkflowSnapshot) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| DomainError::CoordinatorStopped)?;
        Ok(snapshot.clone())
    }

    async fn send(&self, command: Command) -> DomainResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DomainError::CoordinatorStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ComposerConfig, DependencyRecord, EnrichmentConfig, EvaluatorConfig, ExecutorConfig,
        ProtocolRecord, TokenRecord,
    };
    use crate::domain::ports::{ExecutionBackend, ExecutionError};
    use async_trait::async_trait;
    use std::time::Duration;

    struct OkBackend;

    struct SlowBackend(Duration);

    #[async_trait]
    impl ExecutionBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        async fn execute(&self, action: &Action) -> Result<String, ExecutionError> {
            tokio::time::sleep(self.0).await;
            Ok(format!("0x{}", action.token.to_lowercase()))
        }
    }

    #[async_trait]
    impl ExecutionBackend for OkBackend {
        fn name(&self) -> &str {
            "ok"
        }

        async fn execute(&self, action: &Action) -> Result<String, ExecutionError> {
            Ok(format!("0x{}", action.token.to_lowercase()))
        }
    }

    fn pipeline() -> Arc<Pipeline> {
        pipeline_with(Arc::new(OkBackend), &ExecutorConfig::default())
    }

    fn pipeline_with(backend: Arc<dyn ExecutionBackend>, executor: &ExecutorConfig) -> Arc<Pipeline> {
        let catalog = Arc::new(EntityCatalog::new(
            vec![ProtocolRecord::new("Uniswap")],
            vec![TokenRecord::new("USDC"), TokenRecord::new("USDT")],
            vec![
                DependencyRecord::new("Uniswap", "USDC"),
                DependencyRecord::new("Uniswap", "USDT"),
            ],
        ));
        Arc::new(Pipeline {
            evaluator: ThreatEvaluator::new(Arc::clone(&catalog), &EvaluatorConfig::default()),
            enricher: ThreatEnricher::new(EnrichmentConfig::default()),
            composer: ActionComposer::new(Arc::clone(&catalog), &ComposerConfig::default()),
            executor: ActionExecutor::new(backend, executor),
            catalog,
        })
    }

    fn coordinator(config: WorkflowConfig) -> WorkflowCoordinator {
        WorkflowCoordinator::new(pipeline(), Arc::new(EventBus::default()), config)
    }

    const THREAT: &str = "CRITICAL vulnerability in Uniswap detected! USDC at risk.";

    #[tokio::test]
    async fn test_dispatch_runs_to_completed() {
        let mut coordinator = coordinator(WorkflowConfig::default());
        let mut changes = coordinator.subscribe();

        coordinator
            .dispatch(WorkflowEvent::SignalReceived(Signal::tweet(THREAT)))
            .await
            .unwrap();

        assert_eq!(coordinator.state(), WorkflowState::Completed);
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.context.action_plan.len(), 2);
        assert_eq!(snapshot.context.execution_results.len(), 2);

        let states: Vec<_> = std::iter::from_fn(|| changes.try_recv().ok())
            .map(|c| c.to)
            .collect();
        assert_eq!(
            states,
            [
                WorkflowState::Evaluating,
                WorkflowState::Processing,
                WorkflowState::Composing,
                WorkflowState::Executing,
                WorkflowState::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_slow_execution_outlasting_stage_limit_completes() {
        let executor = ExecutorConfig {
            action_timeout_ms: 500,
            ..ExecutorConfig::default()
        };
        let config = WorkflowConfig {
            stage_timeout_ms: 100,
            ..WorkflowConfig::default()
        };
        let backend = Arc::new(SlowBackend(Duration::from_millis(80)));
        let mut coordinator = WorkflowCoordinator::new(
            pipeline_with(backend, &executor),
            Arc::new(EventBus::default()),
            config,
        );
        let mut changes = coordinator.subscribe();

        coordinator
            .dispatch(WorkflowEvent::SignalReceived(Signal::tweet(THREAT)))
            .await
            .unwrap();

        assert_eq!(coordinator.state(), WorkflowState::Completed);
        let results = coordinator.snapshot().context.execution_results;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_success()));

        let completed = std::iter::from_fn(|| changes.try_recv().ok())
            .find(|c| c.to == WorkflowState::Completed)
            .unwrap();
        assert_eq!(
            completed.outcome,
            Some(CycleOutcome::Executed { results })
        );
    }

    #[tokio::test]
    async fn test_preview_does_not_execute() {
        let preview = pipeline().preview(&Signal::tweet(THREAT)).await.unwrap();
        assert!(preview.verdict.is_threat());
        assert_eq!(preview.plan.len(), 2);
    }

    #[tokio::test]
    async fn test_spawned_coordinator_returns_to_idle() {
        let config = WorkflowConfig {
            completion_delay_ms: 200,
            ..WorkflowConfig::default()
        };
        let handle = coordinator(config).spawn();

        handle.submit_signal(Signal::tweet(THREAT)).await.unwrap();
        let completed = tokio::time::timeout(
            Duration::from_secs(5),
            handle.wait_until(|s| s.state == WorkflowState::Completed),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(completed.context.execution_results.len(), 2);

        let idle = tokio::time::timeout(
            Duration::from_secs(5),
            handle.wait_until(|s| {
                s.state == WorkflowState::Idle && s.context.signal_history.len() == 1
            }),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(idle.context.action_plan.is_empty());

        handle.shutdown().await.unwrap();
        assert!(matches!(
            handle.submit_signal(Signal::tweet("late")).await,
            Err(DomainError::CoordinatorStopped)
        ));
    }
}
