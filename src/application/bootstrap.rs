//! Wiring from [`Config`] to a running pipeline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::workflow_coordinator::{Pipeline, WorkflowCoordinator};
use crate::adapters::ai::{AnthropicAnalyst, AnthropicConfig};
use crate::adapters::execution::SimulatedExecutionBackend;
use crate::adapters::feeds::ScriptedSignalFeed;
use crate::domain::models::Config;
use crate::domain::ports::{ActionPlanner, ExecutionBackend, SignalFeed, ThreatAnalyst};
use crate::infrastructure::catalog::CatalogLoader;
use crate::services::{
    ActionComposer, ActionExecutor, EntityCatalog, EventBus, ThreatEnricher, ThreatEvaluator,
};

/// Builds the pipeline, coordinator and feed from configuration.
///
/// Every collaborator can be replaced before building; anything left unset
/// comes from configuration (catalog files, Anthropic when `ai.enabled`,
/// the simulated execution backend).
pub struct Bootstrap {
    config: Config,
    catalog: Option<Arc<EntityCatalog>>,
    analyst: Option<Arc<dyn ThreatAnalyst>>,
    planner: Option<Arc<dyn ActionPlanner>>,
    backend: Option<Arc<dyn ExecutionBackend>>,
}

impl Bootstrap {
    /// Start from `config` with nothing injected.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: None,
            analyst: None,
            planner: None,
            backend: None,
        }
    }

    /// Configuration everything is built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Use `catalog` instead of loading the configured files.
    pub fn with_catalog(mut self, catalog: EntityCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Use `analyst` instead of the configured AI backend.
    pub fn with_analyst(mut self, analyst: Arc<dyn ThreatAnalyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    /// Use `planner` instead of the configured AI backend.
    pub fn with_planner(mut self, planner: Arc<dyn ActionPlanner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Use `backend` instead of the simulated executor.
    pub fn with_backend(mut self, backend: Arc<dyn ExecutionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// The injected catalog, or one loaded from the configured files.
    pub fn catalog(&self) -> Arc<EntityCatalog> {
        self.catalog
            .clone()
            .unwrap_or_else(|| Arc::new(CatalogLoader::load(&self.config.catalog)))
    }

    /// Assemble the four stage services around one catalog.
    pub fn pipeline(&self) -> Pipeline {
        let catalog = self.catalog();
        let (analyst, planner) = self.ai_backends();
        let ai_timeout = self.ai_call_budget();

        let mut evaluator = ThreatEvaluator::new(Arc::clone(&catalog), &self.config.evaluator);
        if let Some(analyst) = analyst {
            evaluator = evaluator
                .with_analyst(analyst)
                .with_analyst_timeout(ai_timeout);
        }

        let mut composer = ActionComposer::new(Arc::clone(&catalog), &self.config.composer);
        if let Some(planner) = planner {
            composer = composer
                .with_planner(planner)
                .with_planner_timeout(ai_timeout);
        }

        let backend = self
            .backend
            .clone()
            .unwrap_or_else(|| Arc::new(SimulatedExecutionBackend::new()));
        let executor = ActionExecutor::new(backend, &self.config.executor);

        info!(
            executor = executor.backend_name(),
            safe_token = composer.safe_token(),
            "pipeline assembled"
        );

        Pipeline {
            evaluator,
            enricher: ThreatEnricher::new(self.config.enrichment.clone()),
            composer,
            executor,
            catalog,
        }
    }

    /// Coordinator over a fresh pipeline and event bus.
    pub fn coordinator(&self) -> WorkflowCoordinator {
        WorkflowCoordinator::new(
            Arc::new(self.pipeline()),
            Arc::new(EventBus::default()),
            self.config.workflow.clone(),
        )
    }

    /// The configured scripted feed, if any.
    pub async fn feed(&self) -> Result<Option<Arc<dyn SignalFeed>>> {
        let Some(path) = &self.config.feed.path else {
            return Ok(None);
        };
        let feed = ScriptedSignalFeed::from_file(path)
            .await
            .with_context(|| format!("Failed to load signal feed from {path}"))?;
        info!(path = %path, signals = feed.remaining(), "scripted feed loaded");
        Ok(Some(Arc::new(feed)))
    }

    fn ai_backends(&self) -> (Option<Arc<dyn ThreatAnalyst>>, Option<Arc<dyn ActionPlanner>>) {
        let mut analyst = self.analyst.clone();
        let mut planner = self.planner.clone();
        if !self.config.ai.enabled || (analyst.is_some() && planner.is_some()) {
            return (analyst, planner);
        }

        match AnthropicAnalyst::new(AnthropicConfig::from(&self.config.ai)) {
            Ok(client) => {
                let client = Arc::new(client);
                info!(model = %self.config.ai.model, "AI backend enabled");
                analyst.get_or_insert_with(|| Arc::clone(&client) as Arc<dyn ThreatAnalyst>);
                planner.get_or_insert_with(|| client as Arc<dyn ActionPlanner>);
            }
            Err(err) => warn!(error = %err, "AI backend enabled but unusable, using local heuristics"),
        }
        (analyst, planner)
    }

    /// Upper bound for one delegated call including its retries.
    ///
    /// Capped at half the stage timeout so the local fallback still runs
    /// inside the stage.
    fn ai_call_budget(&self) -> Duration {
        let attempts = u64::from(self.config.ai.max_retries) + 1;
        let budget = Duration::from_secs(self.config.ai.timeout_secs.saturating_mul(attempts));
        budget.min(self.config.workflow.stage_timeout() / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAnalyst;
    use crate::domain::models::{DependencyRecord, ProtocolRecord, Signal, TokenRecord};

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(
            vec![ProtocolRecord::new("Aave")],
            vec![TokenRecord::new("DAI"), TokenRecord::new("USDC")],
            vec![
                DependencyRecord::new("Aave", "DAI"),
                DependencyRecord::new("Aave", "USDC"),
            ],
        )
    }

    #[tokio::test]
    async fn test_preview_uses_injected_catalog() {
        let bootstrap = Bootstrap::new(Config::default()).with_catalog(catalog());
        let preview = bootstrap
            .pipeline()
            .preview(&Signal::tweet("Aave exploit drained DAI"))
            .await
            .unwrap();

        assert!(preview.verdict.is_threat());
        assert_eq!(preview.plan.len(), 2);
    }

    #[tokio::test]
    async fn test_ai_disabled_never_calls_backend() {
        let mock = Arc::new(MockAnalyst::new());
        let mut config = Config::default();
        config.ai.enabled = false;

        // Injected backends are used regardless of the flag.
        let bootstrap = Bootstrap::new(config)
            .with_catalog(catalog())
            .with_analyst(Arc::clone(&mock) as Arc<dyn ThreatAnalyst>);
        bootstrap
            .pipeline()
            .preview(&Signal::tweet("Aave hack"))
            .await
            .unwrap();
        assert_eq!(mock.assess_calls(), 1);

        let plain = Bootstrap::new(Config::default()).with_catalog(catalog());
        assert!(plain.ai_backends().0.is_none());
    }

    #[test]
    fn test_enabled_ai_without_key_degrades() {
        let mut config = Config::default();
        config.ai.enabled = true;
        config.ai.api_key = None;
        let bootstrap = Bootstrap::new(config);

        temp_env::with_var_unset("ANTHROPIC_API_KEY", || {
            let (analyst, planner) = bootstrap.ai_backends();
            assert!(analyst.is_none());
            assert!(planner.is_none());
        });
    }

    #[test]
    fn test_ai_budget_fits_inside_stage() {
        let mut config = Config::default();
        config.ai.timeout_secs = 30;
        config.ai.max_retries = 3;
        config.workflow.stage_timeout_ms = 60_000;
        assert_eq!(Bootstrap::new(config).ai_call_budget(), Duration::from_secs(30));

        let mut config = Config::default();
        config.ai.timeout_secs = 5;
        config.ai.max_retries = 1;
        assert_eq!(Bootstrap::new(config).ai_call_budget(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_feed_absent_and_present() {
        assert!(Bootstrap::new(Config::default()).feed().await.unwrap().is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, r#"[{"content": "gm"}]"#).unwrap();
        let mut config = Config::default();
        config.feed.path = Some(path.display().to_string());

        let feed = Bootstrap::new(config).feed().await.unwrap().unwrap();
        assert!(!feed.is_exhausted());
    }
}
