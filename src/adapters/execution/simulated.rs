//! In-process execution backend that fabricates transaction references.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::models::Action;
use crate::domain::ports::{ExecutionBackend, ExecutionError};

/// Simulated wallet layer.
///
/// Every accepted action yields `0xsim-<n>` with `n` counting from 1.
/// Individual protocol/token pairs can be rejected and the whole backend
/// can be taken down to reproduce outages.
#[derive(Default)]
pub struct SimulatedExecutionBackend {
    rejected: RwLock<HashSet<(String, String)>>,
    down: AtomicBool,
    latency: Option<Duration>,
    counter: AtomicU64,
}

impl SimulatedExecutionBackend {
    /// Backend that accepts every action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay each execution, for exercising timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reject every future action on this protocol/token pair.
    pub async fn reject(&self, protocol: impl Into<String>, token: impl Into<String>) {
        self.rejected
            .write()
            .await
            .insert((protocol.into(), token.into()));
    }

    /// Take the whole backend down or bring it back.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Number of actions that produced a transaction.
    pub fn executed(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionBackend for SimulatedExecutionBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn execute(&self, action: &Action) -> Result<String, ExecutionError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(ExecutionError::BackendUnavailable(
                "simulated backend is down".to_string(),
            ));
        }

        let key = (action.protocol.clone(), action.token.clone());
        if self.rejected.read().await.contains(&key) {
            return Err(ExecutionError::ActionRejected(format!(
                "{} {} on {} rejected",
                action.action_type.as_str(),
                action.token,
                action.protocol
            )));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_ref = format!("0xsim-{n}");
        info!(
            action = action.action_type.as_str(),
            protocol = %action.protocol,
            token = %action.token,
            tx_ref = %tx_ref,
            "simulated action executed"
        );
        Ok(tx_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_tx_refs() {
        let backend = SimulatedExecutionBackend::new();
        let first = backend.execute(&Action::withdraw("Aave", "DAI")).await.unwrap();
        let second = backend.execute(&Action::revoke("Aave", "USDC")).await.unwrap();

        assert_eq!(first, "0xsim-1");
        assert_eq!(second, "0xsim-2");
        assert_eq!(backend.executed(), 2);
    }

    #[tokio::test]
    async fn test_rejected_pair_only() {
        let backend = SimulatedExecutionBackend::new();
        backend.reject("Aave", "DAI").await;

        let err = backend.execute(&Action::withdraw("Aave", "DAI")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::ActionRejected(_)));
        assert!(backend.execute(&Action::withdraw("Aave", "USDC")).await.is_ok());
    }

    #[tokio::test]
    async fn test_down_backend_is_unavailable() {
        let backend = SimulatedExecutionBackend::new();
        backend.set_down(true);
        assert!(matches!(
            backend.execute(&Action::withdraw("Aave", "DAI")).await,
            Err(ExecutionError::BackendUnavailable(_))
        ));

        backend.set_down(false);
        assert!(backend.execute(&Action::withdraw("Aave", "DAI")).await.is_ok());
    }
}
