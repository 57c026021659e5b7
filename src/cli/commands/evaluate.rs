//! `shieldwall evaluate`: dry run of one post.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::plan_table;
use crate::application::{Bootstrap, Preview};
use crate::cli::display::{colorize_severity, output, CommandOutput};
use crate::domain::models::{Config, Signal, SignalSource, Verdict};

/// Arguments for `shieldwall evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Post content to evaluate
    pub text: String,

    /// Where the post was seen
    #[arg(long, value_enum, default_value_t = SourceArg::Twitter)]
    pub source: SourceArg,
}

/// Signal source as accepted on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum SourceArg {
    /// Twitter / X post
    Twitter,
    /// Discord message
    Discord,
    /// Anything else
    Other,
}

impl From<SourceArg> for SignalSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Twitter => Self::Twitter,
            SourceArg::Discord => Self::Discord,
            SourceArg::Other => Self::Other,
        }
    }
}

/// Signal plus its dry-run outcome.
#[derive(Debug, Serialize)]
pub struct EvaluateOutput {
    /// The evaluated signal.
    pub signal: Signal,
    /// Verdict, enriched threat and plan.
    #[serde(flatten)]
    pub preview: Preview,
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match &self.preview.verdict {
            Verdict::Benign => lines.push("Verdict: benign".to_string()),
            Verdict::Error { message } => lines.push(format!("Verdict: error ({message})")),
            Verdict::Threat { threat } => {
                lines.push(format!(
                    "Verdict: threat [{}]",
                    colorize_severity(threat.severity.as_str())
                ));
                lines.push(format!("  Description: {}", threat.description));
            }
        }

        if let Some(threat) = &self.preview.enriched {
            let join = |items: &std::collections::BTreeSet<String>| {
                items.iter().cloned().collect::<Vec<_>>().join(", ")
            };
            lines.push(format!("  Protocols:   {}", join(&threat.affected_protocols)));
            lines.push(format!("  Tokens:      {}", join(&threat.affected_tokens)));
            lines.push(format!("  Chain:       {}", threat.chain));
            lines.push(format!("  Severity:    {}", threat.severity));

            if self.preview.plan.is_empty() {
                lines.push("\nNo actions planned.".to_string());
            } else {
                lines.push(format!("\nPlan ({} actions):", self.preview.plan.len()));
                lines.push(plan_table(&self.preview.plan).to_string());
            }
        }
        lines.join("\n")
    }
}

/// Evaluate one post without executing anything.
pub async fn execute(args: EvaluateArgs, config: Config, json_mode: bool) -> Result<()> {
    let signal = Signal::new(args.source.into(), args.text);
    let pipeline = Bootstrap::new(config).pipeline();
    let preview = pipeline
        .preview(&signal)
        .await
        .context("Failed to evaluate signal")?;

    output(&EvaluateOutput { signal, preview }, json_mode);
    Ok(())
}
