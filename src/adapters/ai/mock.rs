//! Scripted AI backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::models::{Action, DependencyGraph, Threat};
use crate::domain::ports::{
    ActionPlanner, AnalystError, AnalystVerdict, AssessmentRequest, ThreatAnalyst,
};

/// Answers queued ahead of time, consumed in order.
///
/// Once a queue runs dry every further call fails with
/// [`AnalystError::Unavailable`], which exercises the local fallbacks.
#[derive(Default)]
pub struct MockAnalyst {
    verdicts: Mutex<VecDeque<Result<AnalystVerdict, AnalystError>>>,
    plans: Mutex<VecDeque<Result<Vec<Action>, AnalystError>>>,
    assess_calls: AtomicUsize,
    propose_calls: AtomicUsize,
}

impl MockAnalyst {
    /// Analyst with nothing scripted; every call fails as unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next verdict.
    pub fn with_verdict(self, verdict: AnalystVerdict) -> Self {
        self.push_verdict(Ok(verdict));
        self
    }

    /// Script the next assessment to fail.
    pub fn with_assess_failure(self, error: AnalystError) -> Self {
        self.push_verdict(Err(error));
        self
    }

    /// Script the next plan.
    pub fn with_plan(self, plan: Vec<Action>) -> Self {
        self.push_plan(Ok(plan));
        self
    }

    /// Script the next proposal to fail.
    pub fn with_plan_failure(self, error: AnalystError) -> Self {
        self.push_plan(Err(error));
        self
    }

    /// Append a verdict or failure after construction.
    pub fn push_verdict(&self, verdict: Result<AnalystVerdict, AnalystError>) {
        if let Ok(mut queue) = self.verdicts.lock() {
            queue.push_back(verdict);
        }
    }

    /// Append a plan or failure after construction.
    pub fn push_plan(&self, plan: Result<Vec<Action>, AnalystError>) {
        if let Ok(mut queue) = self.plans.lock() {
            queue.push_back(plan);
        }
    }

    /// Number of `assess` calls so far.
    pub fn assess_calls(&self) -> usize {
        self.assess_calls.load(Ordering::SeqCst)
    }

    /// Number of `propose` calls so far.
    pub fn propose_calls(&self) -> usize {
        self.propose_calls.load(Ordering::SeqCst)
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, AnalystError>>>) -> Result<T, AnalystError> {
    queue
        .lock()
        .ok()
        .and_then(|mut queue| queue.pop_front())
        .unwrap_or_else(|| Err(AnalystError::Unavailable("no scripted answer left".to_string())))
}

#[async_trait]
impl ThreatAnalyst for MockAnalyst {
    fn name(&self) -> &str {
        "mock"
    }

    async fn assess(&self, _request: &AssessmentRequest) -> Result<AnalystVerdict, AnalystError> {
        self.assess_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.verdicts)
    }
}

#[async_trait]
impl ActionPlanner for MockAnalyst {
    fn name(&self) -> &str {
        "mock"
    }

    async fn propose(
        &self,
        _threat: &Threat,
        _graph: &DependencyGraph,
    ) -> Result<Vec<Action>, AnalystError> {
        self.propose_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CatalogContext;

    #[tokio::test]
    async fn test_answers_in_order_then_unavailable() {
        let mock = MockAnalyst::new()
            .with_verdict(AnalystVerdict::default())
            .with_assess_failure(AnalystError::Network("reset".into()));
        let request = AssessmentRequest {
            content: "hello".into(),
            catalog: CatalogContext::default(),
        };

        assert!(!mock.assess(&request).await.unwrap().is_threat);
        assert!(matches!(mock.assess(&request).await, Err(AnalystError::Network(_))));
        assert!(matches!(mock.assess(&request).await, Err(AnalystError::Unavailable(_))));
        assert_eq!(mock.assess_calls(), 3);
        assert_eq!(mock.propose_calls(), 0);
    }
}
