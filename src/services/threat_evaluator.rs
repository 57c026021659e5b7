//! Threat evaluation: AI verdict first, keyword and entity heuristics second.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::entity_catalog::EntityCatalog;
use super::fallback::FallbackChain;
use crate::domain::models::threat::UNKNOWN_TOKEN;
use crate::domain::models::{EvaluatorConfig, Severity, Signal, Threat, Verdict};
use crate::domain::ports::{AnalystError, AnalystVerdict, AssessmentRequest, ThreatAnalyst};

/// Turns raw signals into threat verdicts.
///
/// Never fails for recoverable conditions: backend problems trigger the
/// local heuristics, and an unusable signal yields [`Verdict::Error`].
pub struct ThreatEvaluator {
    catalog: Arc<EntityCatalog>,
    analyst: Option<Arc<dyn ThreatAnalyst>>,
    analyst_timeout: Option<Duration>,
    keywords: Vec<String>,
    default_chain: String,
    chains: Vec<String>,
}

impl ThreatEvaluator {
    /// Evaluator with the configured keywords and chains, no AI backend.
    pub fn new(catalog: Arc<EntityCatalog>, config: &EvaluatorConfig) -> Self {
        let keywords = config
            .threat_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let mut chains: BTreeSet<String> = catalog.known_chains();
        chains.extend(config.known_chains.iter().map(|c| c.trim().to_lowercase()));
        chains.retain(|c| !c.is_empty());

        Self {
            catalog,
            analyst: None,
            analyst_timeout: None,
            keywords,
            default_chain: config.default_chain.to_lowercase(),
            chains: chains.into_iter().collect(),
        }
    }

    /// Delegate evaluation to an AI backend before the heuristics.
    pub fn with_analyst(mut self, analyst: Arc<dyn ThreatAnalyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    /// Bound each delegated evaluation.
    pub fn with_analyst_timeout(mut self, timeout: Duration) -> Self {
        self.analyst_timeout = Some(timeout);
        self
    }

    /// Evaluate one signal.
    #[instrument(skip_all, fields(signal_id = %signal.id, source = %signal.source))]
    pub async fn evaluate(&self, signal: &Signal) -> Verdict {
        if signal.content.trim().is_empty() {
            return Verdict::Error {
                message: "signal content is empty".to_string(),
            };
        }

        let primary = self.analyst.as_ref().map(|analyst| {
            let analyst = Arc::clone(analyst);
            let request = AssessmentRequest {
                content: signal.content.clone(),
                catalog: self.catalog.context(),
            };
            async move {
                let verdict = analyst.assess(&request).await?;
                self.verdict_from_analyst(&request.content, verdict)
            }
        });

        let mut chain = FallbackChain::new("evaluation", primary, || {
            self.heuristic_verdict(&signal.content)
        });
        if let Some(limit) = self.analyst_timeout {
            chain = chain.with_timeout(limit);
        }

        let resolution = chain.resolve().await;
        let source = resolution.source();
        let verdict = resolution.into_inner();
        info!(source, is_threat = verdict.is_threat(), "signal evaluated");
        verdict
    }

    /// Convert a backend verdict, rejecting inconsistent payloads.
    fn verdict_from_analyst(&self, content: &str, verdict: AnalystVerdict) -> Result<Verdict, AnalystError> {
        if !verdict.is_threat {
            return Ok(Verdict::Benign);
        }
        let details = verdict.threat_details.ok_or_else(|| {
            AnalystError::MalformedResponse("threat verdict without threat details".to_string())
        })?;

        let mut threat = Threat::new(
            details.description.unwrap_or_else(|| content.to_string()),
            details.severity.unwrap_or_else(|| Severity::from_text(content)),
        )
        .with_protocols(
            details
                .affected_protocols
                .iter()
                .map(|p| self.catalog.canonical_protocol(p)),
        )
        .with_tokens(
            details
                .affected_tokens
                .iter()
                .map(|t| self.catalog.canonical_token(t)),
        )
        .on_chain(
            details
                .chain
                .map_or_else(|| self.detect_chain(content), |c| c.to_lowercase()),
        );
        if threat.affected_tokens.is_empty() {
            threat.affected_tokens.insert(UNKNOWN_TOKEN.to_string());
        }
        Ok(Verdict::Threat { threat })
    }

    /// Local keyword and entity matching.
    pub fn heuristic_verdict(&self, content: &str) -> Verdict {
        let lower = content.to_lowercase();

        if !self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            debug!("no threat keywords matched");
            return Verdict::Benign;
        }

        let protocols = Self::match_names(&lower, self.catalog.protocol_names(), |name| {
            self.catalog.normalize_protocol(name)
        });
        if protocols.is_empty() {
            // Flagged but unattributable signals are treated as noise.
            debug!("threat keywords matched but no known protocol named");
            return Verdict::Benign;
        }

        let mut tokens = Self::match_names(&lower, self.catalog.token_symbols(), |symbol| {
            self.catalog.normalize_token(symbol)
        });
        if tokens.is_empty() {
            tokens.insert(UNKNOWN_TOKEN.to_string());
        }

        let threat = Threat::new(content, Severity::from_text(&lower))
            .with_protocols(protocols)
            .with_tokens(tokens)
            .on_chain(self.detect_chain(&lower));
        Verdict::Threat { threat }
    }

    /// Case-insensitive substring match of catalog names against content.
    ///
    /// Matches are mapped back to canonical casing; a name that does not
    /// resolve is kept in lower case rather than dropped.
    fn match_names<'a, N>(
        lower: &str,
        names: impl Iterator<Item = &'a str>,
        normalize: N,
    ) -> BTreeSet<String>
    where
        N: Fn(&str) -> Option<&'a str>,
    {
        names
            .map(str::to_lowercase)
            .filter(|name| !name.is_empty() && lower.contains(name.as_str()))
            .map(|name| normalize(&name).map_or(name.clone(), str::to_string))
            .collect()
    }

    /// The first known chain named in the text, by position.
    fn detect_chain(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        words
            .iter()
            .find(|word| self.chains.iter().any(|chain| chain == *word))
            .map_or_else(|| self.default_chain.clone(), |word| (*word).to_string())
    }
}
