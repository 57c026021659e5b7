//! Sequential batch execution with per-action failure isolation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::models::{Action, ExecutionResult, ExecutorConfig};
use crate::domain::ports::{ExecutionBackend, ExecutionError};

/// Runs a plan against an [`ExecutionBackend`], one result per action.
pub struct ActionExecutor {
    backend: Arc<dyn ExecutionBackend>,
    action_timeout: Duration,
}

impl ActionExecutor {
    /// Executor with the configured per-action timeout.
    pub fn new(backend: Arc<dyn ExecutionBackend>, config: &ExecutorConfig) -> Self {
        Self {
            backend,
            action_timeout: config.action_timeout(),
        }
    }

    /// Backend identifier.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Execute every action in order.
    ///
    /// Returns exactly one result per action, in input order. A rejected or
    /// timed-out action is recorded as failed and the batch continues. If the
    /// backend reports itself unavailable, that action and every later one
    /// are marked failed with the same error without further calls.
    #[instrument(skip_all, fields(backend = self.backend.name(), actions = actions.len()))]
    pub async fn execute_all(&self, actions: &[Action]) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            match self.execute_one(action).await {
                Ok(tx_ref) => {
                    info!(protocol = %action.protocol, token = %action.token, %tx_ref, "action executed");
                    results.push(ExecutionResult::success(action.clone(), tx_ref));
                }
                Err(ExecutionError::ActionRejected(reason)) => {
                    warn!(protocol = %action.protocol, token = %action.token, %reason, "action failed");
                    results.push(ExecutionResult::failed(action.clone(), reason));
                }
                Err(err @ ExecutionError::BackendUnavailable(_)) => {
                    let message = err.to_string();
                    warn!(error = %message, remaining = actions.len() - index, "execution backend down, failing remaining actions");
                    results.extend(
                        actions[index..]
                            .iter()
                            .map(|a| ExecutionResult::failed(a.clone(), message.clone())),
                    );
                    break;
                }
            }
        }

        results
    }

    async fn execute_one(&self, action: &Action) -> Result<String, ExecutionError> {
        match tokio::time::timeout(self.action_timeout, self.backend.execute(action)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::ActionRejected(format!(
                "timed out after {}ms",
                self.action_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ExecutionStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the call at `fail_at` with the given error.
    struct ScriptedBackend {
        calls: AtomicUsize,
        fail_at: usize,
        error: ExecutionError,
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn execute(&self, action: &Action) -> Result<String, ExecutionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_at {
                return Err(self.error.clone());
            }
            Ok(format!("tx-{}-{}", call, action.token))
        }
    }

    fn actions() -> Vec<Action> {
        vec![
            Action::withdraw("Uniswap", "USDC"),
            Action::swap("Uniswap", "USDT", "USDC"),
            Action::withdraw("Aave", "DAI"),
        ]
    }

    fn executor(fail_at: usize, error: ExecutionError) -> (ActionExecutor, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend {
            calls: AtomicUsize::new(0),
            fail_at,
            error,
        });
        let executor = ActionExecutor::new(backend.clone(), &ExecutorConfig::default());
        (executor, backend)
    }

    #[tokio::test]
    async fn test_middle_failure_is_isolated() {
        let (executor, _) = executor(1, ExecutionError::ActionRejected("slippage".into()));
        let results = executor.execute_all(&actions()).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[1].status(), ExecutionStatus::Failed);
        assert_eq!(results[1].error(), Some("slippage"));
        assert!(results[2].is_success());
        for (result, action) in results.iter().zip(actions()) {
            assert_eq!(result.action, action);
        }
    }

    #[tokio::test]
    async fn test_backend_outage_fails_remaining() {
        let (executor, backend) =
            executor(1, ExecutionError::BackendUnavailable("rpc down".into()));
        let results = executor.execute_all(&actions()).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[1].error(), results[2].error());
        assert!(results[2].error().unwrap().contains("rpc down"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let (executor, _) = executor(0, ExecutionError::ActionRejected("x".into()));
        assert!(executor.execute_all(&[]).await.is_empty());
    }

    struct StalledBackend;

    #[async_trait]
    impl ExecutionBackend for StalledBackend {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn execute(&self, _: &Action) -> Result<String, ExecutionError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test]
    async fn test_action_timeout_is_per_action_failure() {
        let config = ExecutorConfig { action_timeout_ms: 10 };
        let executor = ActionExecutor::new(Arc::new(StalledBackend), &config);
        let results = executor.execute_all(&actions()[..2]).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error().is_some_and(|e| e.contains("timed out"))));
    }
}
