//! CLI command implementations.

pub mod catalog;
pub mod config;
pub mod evaluate;
pub mod run;

use comfy_table::Table;

use crate::cli::display::{colorize_status, list_table};
use crate::domain::models::{Action, ExecutionResult};

fn format_params(action: &Action) -> String {
    action
        .params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numbered table of planned actions.
pub(crate) fn plan_table(plan: &[Action]) -> Table {
    let mut table = list_table(&["#", "type", "protocol", "token", "params"]);
    for (index, action) in plan.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            action.action_type.to_string(),
            action.protocol.clone(),
            action.token.clone(),
            format_params(action),
        ]);
    }
    table
}

/// Table of execution results in plan order.
pub(crate) fn results_table(results: &[ExecutionResult]) -> Table {
    let mut table = list_table(&["#", "type", "protocol", "token", "status", "detail"]);
    for (index, result) in results.iter().enumerate() {
        let detail = result.tx_ref().or_else(|| result.error()).unwrap_or_default();
        table.add_row(vec![
            (index + 1).to_string(),
            result.action.action_type.to_string(),
            result.action.protocol.clone(),
            result.action.token.clone(),
            colorize_status(result.status().as_str()).to_string(),
            detail.to_string(),
        ]);
    }
    table
}
