//! Remediation actions and their execution results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Amount used by the fallback composer: move the entire position.
pub const FULL_POSITION: &str = "100%";

/// Kind of protective operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Swap the position into another token.
    Swap,
    /// Withdraw the position.
    Withdraw,
    /// Revoke token approvals.
    Revoke,
}

impl ActionType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::Withdraw => "withdraw",
            Self::Revoke => "revoke",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar action parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean parameter.
    Flag(bool),
    /// Numeric parameter.
    Number(f64),
    /// Text parameter.
    Text(String),
}

impl ParamValue {
    /// The text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A single protective operation on one protocol/token pair.
///
/// Actions are never mutated after the composer creates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What to do.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Protocol holding the position.
    pub protocol: String,
    /// Token the action applies to.
    pub token: String,
    /// Action parameters such as `amount` and `toToken`.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl Action {
    /// Action with no parameters.
    pub fn new(action_type: ActionType, protocol: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            action_type,
            protocol: protocol.into(),
            token: token.into(),
            params: BTreeMap::new(),
        }
    }

    /// Withdraw the full position of `token` from `protocol`.
    pub fn withdraw(protocol: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(ActionType::Withdraw, protocol, token).with_param("amount", FULL_POSITION)
    }

    /// Swap the full position of `token` into `to_token`.
    pub fn swap(
        protocol: impl Into<String>,
        token: impl Into<String>,
        to_token: impl Into<String>,
    ) -> Self {
        Self::new(ActionType::Swap, protocol, token)
            .with_param("toToken", ParamValue::Text(to_token.into()))
            .with_param("amount", FULL_POSITION)
    }

    /// Revoke outstanding approvals of `token` towards `protocol`.
    pub fn revoke(protocol: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(ActionType::Revoke, protocol, token)
    }

    /// Add or replace one parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up one parameter.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Structural sanity check used on externally proposed plans.
    pub fn is_well_formed(&self) -> bool {
        !self.protocol.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.action_type, self.token, self.protocol)
    }
}

/// Terminal status of one executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The action went through.
    Success,
    /// The action was not executed.
    Failed,
}

impl ExecutionStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// What happened to an action: a transaction reference or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// The action went through.
    Success {
        /// Backend transaction reference.
        tx_ref: String,
    },
    /// The action was not executed.
    Failed {
        /// Why the action failed.
        error: String,
    },
}

/// One result per executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The action that was attempted.
    pub action: Action,
    /// Transaction reference or error.
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
    /// When the attempt settled.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    /// Successful result with its transaction reference.
    pub fn success(action: Action, tx_ref: impl Into<String>) -> Self {
        Self {
            action,
            outcome: ExecutionOutcome::Success { tx_ref: tx_ref.into() },
            timestamp: Utc::now(),
        }
    }

    /// Failed result with its error message.
    pub fn failed(action: Action, error: impl Into<String>) -> Self {
        Self {
            action,
            outcome: ExecutionOutcome::Failed { error: error.into() },
            timestamp: Utc::now(),
        }
    }

    /// Success or failure without the payload.
    pub fn status(&self) -> ExecutionStatus {
        match self.outcome {
            ExecutionOutcome::Success { .. } => ExecutionStatus::Success,
            ExecutionOutcome::Failed { .. } => ExecutionStatus::Failed,
        }
    }

    /// Whether the action went through.
    pub fn is_success(&self) -> bool {
        self.status() == ExecutionStatus::Success
    }

    /// Transaction reference of a successful result.
    pub fn tx_ref(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Success { tx_ref } => Some(tx_ref),
            ExecutionOutcome::Failed { .. } => None,
        }
    }

    /// Error message of a failed result.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Failed { error } => Some(error),
            ExecutionOutcome::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_params() {
        let action = Action::withdraw("Uniswap", "USDC");
        assert_eq!(action.action_type, ActionType::Withdraw);
        assert_eq!(action.param("amount").and_then(ParamValue::as_text), Some("100%"));
        assert!(action.param("toToken").is_none());
    }

    #[test]
    fn test_swap_params() {
        let action = Action::swap("Uniswap", "USDT", "USDC");
        assert_eq!(action.action_type, ActionType::Swap);
        assert_eq!(action.param("toToken").and_then(ParamValue::as_text), Some("USDC"));
        assert_eq!(action.param("amount").and_then(ParamValue::as_text), Some("100%"));
    }

    #[test]
    fn test_action_deserializes_external_shape() {
        let json = r#"{"type":"swap","protocol":"Aave","token":"DAI","params":{"toToken":"USDC","amount":"100%","slippage":0.5}}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.action_type, ActionType::Swap);
        assert_eq!(action.param("slippage"), Some(&ParamValue::Number(0.5)));
        assert!(action.is_well_formed());
    }

    #[test]
    fn test_malformed_action_detected() {
        let action = Action::withdraw("  ", "USDC");
        assert!(!action.is_well_formed());
    }

    #[test]
    fn test_result_outcome_accessors() {
        let ok = ExecutionResult::success(Action::revoke("Aave", "DAI"), "0xabc");
        assert!(ok.is_success());
        assert_eq!(ok.tx_ref(), Some("0xabc"));
        assert!(ok.error().is_none());

        let failed = ExecutionResult::failed(Action::revoke("Aave", "DAI"), "reverted");
        assert_eq!(failed.status(), ExecutionStatus::Failed);
        assert_eq!(failed.error(), Some("reverted"));
        assert!(failed.tx_ref().is_none());
    }

    #[test]
    fn test_result_serializes_flat_status() {
        let failed = ExecutionResult::failed(Action::withdraw("Aave", "DAI"), "boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["action"]["type"], "withdraw");
    }
}
