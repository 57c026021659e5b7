//! Color mapping for workflow states, severities and execution status.
//!
//! `console` drops styling automatically when stdout is not a terminal.

use console::{style, StyledObject};

/// Color a workflow state name.
pub fn colorize_state(state: &str) -> StyledObject<&str> {
    match state {
        "idle" => style(state).dim(),
        "evaluating" | "processing" | "composing" | "executing" => style(state).yellow(),
        "completed" => style(state).green().bold(),
        "failed" => style(state).red().bold(),
        _ => style(state).white(),
    }
}

/// Color a severity name.
pub fn colorize_severity(severity: &str) -> StyledObject<&str> {
    match severity {
        "critical" => style(severity).red().bold(),
        "high" => style(severity).red(),
        "medium" => style(severity).yellow(),
        "low" => style(severity).dim(),
        _ => style(severity).white(),
    }
}

/// Color an execution status.
pub fn colorize_status(status: &str) -> StyledObject<&str> {
    match status {
        "success" => style(status).green(),
        "failed" => style(status).red().bold(),
        _ => style(status).white(),
    }
}
