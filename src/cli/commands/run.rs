//! `shieldwall run`: poll a feed and drive the workflow until interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::results_table;
use crate::application::signal_poller::PollerExit;
use crate::application::{Bootstrap, SignalPoller};
use crate::cli::display::{colorize_state, output, CommandOutput};
use crate::domain::models::{Config, ExecutionResult, WorkflowSnapshot, WorkflowState};
use crate::services::{CycleOutcome, StateChange};

/// Arguments for `shieldwall run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON file of posts to replay (overrides feed.path)
    #[arg(short, long)]
    pub feed: Option<PathBuf>,

    /// Exit once the feed is exhausted and the workflow is at rest
    #[arg(long)]
    pub drain: bool,
}

/// Tally printed when `run` exits.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    /// Signals handed to the coordinator.
    pub signals_submitted: usize,
    /// Cycles that reached `completed`.
    pub cycles_completed: usize,
    /// Cycles that reached `failed`.
    pub cycles_failed: usize,
    /// Actions that executed.
    pub actions_succeeded: usize,
    /// Actions the backend rejected.
    pub actions_failed: usize,
    /// State when the coordinator stopped.
    pub final_state: Option<WorkflowState>,
    /// Whether Ctrl-C ended the run.
    pub interrupted: bool,
}

impl RunSummary {
    fn record_results(&mut self, results: &[ExecutionResult]) {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.cycles_completed += 1;
        self.actions_succeeded += succeeded;
        self.actions_failed += results.len() - succeeded;
    }
}

impl CommandOutput for RunSummary {
    fn to_human(&self) -> String {
        let state = self.final_state.map_or("unknown", |s| s.as_str());
        let mut lines = vec![
            "\nRun summary:".to_string(),
            format!("  Signals submitted: {}", self.signals_submitted),
            format!("  Cycles completed:  {}", self.cycles_completed),
            format!("  Cycles failed:     {}", self.cycles_failed),
            format!(
                "  Actions:           {} succeeded, {} failed",
                self.actions_succeeded, self.actions_failed
            ),
            format!("  Final state:       {}", colorize_state(state)),
        ];
        if self.interrupted {
            lines.push("  (interrupted)".to_string());
        }
        lines.join("\n")
    }
}

/// Nothing left to do: idle with an empty queue, or failed awaiting a retry.
fn at_rest(snapshot: &WorkflowSnapshot) -> bool {
    match snapshot.state {
        WorkflowState::Idle => snapshot.context.queued_signals.is_empty(),
        WorkflowState::Failed => true,
        _ => false,
    }
}

/// Poll the feed and drive the workflow until drained or interrupted.
pub async fn execute(args: RunArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(feed) = &args.feed {
        config.feed.path = Some(feed.display().to_string());
    }
    let poll_interval = config.feed.poll_interval();

    let bootstrap = Bootstrap::new(config);
    let feed = bootstrap
        .feed()
        .await?
        .context("No signal feed configured; pass --feed or set feed.path")?;

    let coordinator = bootstrap.coordinator();
    let changes = coordinator.subscribe();
    let handle = coordinator.spawn();
    let (stop_tx, stop_rx) = watch::channel(false);

    let reporter = tokio::spawn(report(changes, stop_rx.clone(), json_mode));
    let mut poller =
        tokio::spawn(SignalPoller::new(feed, handle.clone(), poll_interval).run(stop_rx));

    let mut polled: Option<usize> = None;
    let work = async {
        let (submitted, exit) = (&mut poller)
            .await
            .context("Signal poller task failed")??;
        info!(submitted, ?exit, "signal poller finished");
        polled = Some(submitted);
        if args.drain && exit == PollerExit::Exhausted {
            handle.flush().await?;
            handle.wait_until(at_rest).await?;
        } else {
            std::future::pending::<()>().await;
        }
        anyhow::Ok(())
    };

    let interrupted = tokio::select! {
        result = work => {
            result?;
            false
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for interrupt")?;
            info!("interrupt received, shutting down");
            true
        }
    };

    let _ = stop_tx.send(true);
    // The poller handle may already have been consumed above.
    let submitted = match polled {
        Some(submitted) => submitted,
        None => poller
            .await
            .context("Signal poller task failed")??
            .0,
    };
    let final_state = handle.state();
    if let Err(err) = handle.shutdown().await {
        warn!(error = %err, "coordinator already stopped");
    }

    let mut summary = reporter.await.context("Reporter task failed")?;
    summary.signals_submitted = submitted;
    summary.final_state = Some(final_state);
    summary.interrupted = interrupted;
    output(&summary, json_mode);
    Ok(())
}

/// Print transitions as they happen and tally cycle outcomes.
async fn report(
    mut changes: broadcast::Receiver<StateChange>,
    mut stop: watch::Receiver<bool>,
    json_mode: bool,
) -> RunSummary {
    let mut summary = RunSummary::default();
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) => on_change(&change, &mut summary, json_mode),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "transition reporter lagged"),
                Err(RecvError::Closed) => return summary,
            },
            _ = stop.changed() => break,
        }
    }

    loop {
        match changes.try_recv() {
            Ok(change) => on_change(&change, &mut summary, json_mode),
            Err(TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
    summary
}

fn on_change(change: &StateChange, summary: &mut RunSummary, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string(change).unwrap_or_default());
    } else {
        println!(
            "{} [#{}] {} -> {} ({})",
            change.timestamp.format("%H:%M:%S%.3f"),
            change.sequence,
            colorize_state(change.from.as_str()),
            colorize_state(change.to.as_str()),
            change.trigger
        );
    }

    match &change.outcome {
        Some(CycleOutcome::Executed { results }) => {
            summary.record_results(results);
            if !json_mode && !results.is_empty() {
                println!("{}", results_table(results));
            }
        }
        Some(CycleOutcome::Failed { failure }) => {
            summary.cycles_failed += 1;
            if !json_mode {
                println!("  {} stage failed: {}", failure.stage, failure.message);
            }
        }
        None => {}
    }
}
