//! Raw catalog records as supplied by static configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protocol name to the token symbols it exposes, in insertion order.
pub type DependencyGraph = BTreeMap<String, Vec<String>>;

/// A monitored protocol and its per-chain contract addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRecord {
    /// Canonical protocol name.
    pub name: String,
    /// Chain name to contract address.
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
    /// Free-form grouping such as `dex` or `lending`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProtocolRecord {
    /// Record with no addresses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: BTreeMap::new(),
            category: None,
        }
    }

    /// Add the address on `chain`.
    pub fn with_address(mut self, chain: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.insert(chain.into(), address.into());
        self
    }
}

/// A token held or exposed through monitored protocols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Canonical token symbol.
    pub symbol: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Decimal places.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Chain name to token address.
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
}

impl TokenRecord {
    /// Record with only a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            decimals: None,
            addresses: BTreeMap::new(),
        }
    }

    /// Add the address on `chain`.
    pub fn with_address(mut self, chain: impl Into<String>, address: impl Into<String>) -> Self {
        self.addresses.insert(chain.into(), address.into());
        self
    }
}

/// Swap route through which a token can leave a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapFunction {
    /// Protocol offering the swap.
    pub protocol: String,
    /// Function name used for the swap.
    #[serde(default)]
    pub function: String,
}

/// Declares that `token` is exposed through `protocol`.
///
/// Any swap function naming another protocol also makes the token a
/// dependent of that protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Protocol exposing the token.
    pub protocol: String,
    /// Dependent token symbol.
    pub token: String,
    /// Other protocols the token can be swapped through.
    #[serde(default, alias = "swapFunctions")]
    pub swap_functions: Vec<SwapFunction>,
}

impl DependencyRecord {
    /// Plain protocol to token edge.
    pub fn new(protocol: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            token: token.into(),
            swap_functions: Vec::new(),
        }
    }

    /// Add a swap route through `protocol`.
    pub fn with_swap(mut self, protocol: impl Into<String>, function: impl Into<String>) -> Self {
        self.swap_functions.push(SwapFunction {
            protocol: protocol.into(),
            function: function.into(),
        });
        self
    }
}
