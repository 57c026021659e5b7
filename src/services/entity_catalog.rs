//! Entity catalog: protocols, tokens and the derived dependency graph.
//!
//! The catalog is built once at startup and shared behind an `Arc`.
//! Name maps and the dependency graph are derived lazily on first use and
//! cached for the catalog's lifetime; `OnceLock` makes that initialization
//! race-free under concurrent readers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use crate::domain::models::{DependencyGraph, DependencyRecord, ProtocolRecord, TokenRecord};
use crate::domain::ports::CatalogContext;

/// Static lookup tables for monitored protocols and tokens.
#[derive(Debug, Default)]
pub struct EntityCatalog {
    protocols: Vec<ProtocolRecord>,
    tokens: Vec<TokenRecord>,
    dependencies: Vec<DependencyRecord>,
    protocol_index: OnceLock<HashMap<String, String>>,
    token_index: OnceLock<HashMap<String, String>>,
    graph: OnceLock<DependencyGraph>,
    token_protocols: OnceLock<BTreeMap<String, Vec<String>>>,
}

fn lower_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Map lower-cased names to their configured spelling; first entry wins.
fn build_index<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for name in names {
        index
            .entry(lower_key(name))
            .or_insert_with(|| name.trim().to_string());
    }
    index
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

impl EntityCatalog {
    /// Catalog over the given records. Lookup tables are built on first use.
    pub fn new(
        protocols: Vec<ProtocolRecord>,
        tokens: Vec<TokenRecord>,
        dependencies: Vec<DependencyRecord>,
    ) -> Self {
        Self {
            protocols,
            tokens,
            dependencies,
            ..Self::default()
        }
    }

    /// A catalog where every lookup comes back absent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether there are no protocols and no tokens.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty() && self.tokens.is_empty()
    }

    /// Protocol records in load order.
    pub fn protocols(&self) -> &[ProtocolRecord] {
        &self.protocols
    }

    /// Token records in load order.
    pub fn tokens(&self) -> &[TokenRecord] {
        &self.tokens
    }

    /// Dependency records in load order.
    pub fn dependencies(&self) -> &[DependencyRecord] {
        &self.dependencies
    }

    fn protocol_index(&self) -> &HashMap<String, String> {
        self.protocol_index
            .get_or_init(|| build_index(self.protocols.iter().map(|p| p.name.as_str())))
    }

    fn token_index(&self) -> &HashMap<String, String> {
        self.token_index
            .get_or_init(|| build_index(self.tokens.iter().map(|t| t.symbol.as_str())))
    }

    /// Canonical spelling of a protocol name, matched case-insensitively.
    pub fn normalize_protocol(&self, name: &str) -> Option<&str> {
        self.protocol_index().get(&lower_key(name)).map(String::as_str)
    }

    /// Canonical spelling of a token symbol, matched case-insensitively.
    pub fn normalize_token(&self, symbol: &str) -> Option<&str> {
        self.token_index().get(&lower_key(symbol)).map(String::as_str)
    }

    /// Canonical protocol name, or the input unchanged when unknown.
    pub fn canonical_protocol(&self, name: &str) -> String {
        self.normalize_protocol(name)
            .map_or_else(|| name.to_string(), str::to_string)
    }

    /// Canonical token symbol, or the input unchanged when unknown.
    pub fn canonical_token(&self, symbol: &str) -> String {
        self.normalize_token(symbol)
            .map_or_else(|| symbol.to_string(), str::to_string)
    }

    /// Whether `name` is a known protocol, ignoring case.
    pub fn is_valid_protocol(&self, name: &str) -> bool {
        self.normalize_protocol(name).is_some()
    }

    /// Whether `symbol` is a known token, ignoring case.
    pub fn is_valid_token(&self, symbol: &str) -> bool {
        self.normalize_token(symbol).is_some()
    }

    /// Canonical protocol names in catalog order.
    pub fn protocol_names(&self) -> impl Iterator<Item = &str> {
        self.protocols.iter().map(|p| p.name.as_str())
    }

    /// Canonical token symbols in catalog order.
    pub fn token_symbols(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.symbol.as_str())
    }

    /// Protocol → dependent token symbols.
    ///
    /// Every dependency record contributes an edge from its own protocol,
    /// plus one from each protocol named by its swap functions. A token is
    /// listed at most once per protocol, in first-seen order.
    pub fn dependency_graph(&self) -> &DependencyGraph {
        self.graph.get_or_init(|| {
            let mut graph = DependencyGraph::new();
            for record in &self.dependencies {
                let token = self.canonical_token(&record.token);
                let owners = std::iter::once(record.protocol.as_str())
                    .chain(record.swap_functions.iter().map(|f| f.protocol.as_str()));
                for owner in owners {
                    if owner.trim().is_empty() {
                        continue;
                    }
                    let entry = graph.entry(self.canonical_protocol(owner)).or_default();
                    push_unique(entry, &token);
                }
            }
            graph
        })
    }

    /// Dependent tokens of one protocol, empty when the protocol is unknown.
    pub fn dependent_tokens(&self, protocol: &str) -> &[String] {
        let key = self.canonical_protocol(protocol);
        self.dependency_graph()
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Token → protocols that expose it.
    pub fn protocols_for_token(&self, symbol: &str) -> &[String] {
        let index = self.token_protocols.get_or_init(|| {
            let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (protocol, tokens) in self.dependency_graph() {
                for token in tokens {
                    push_unique(index.entry(token.clone()).or_default(), protocol);
                }
            }
            index
        });
        index
            .get(&self.canonical_token(symbol))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Lower-cased chain names that appear in any record's addresses.
    pub fn known_chains(&self) -> BTreeSet<String> {
        self.protocols
            .iter()
            .flat_map(|p| p.addresses.keys())
            .chain(self.tokens.iter().flat_map(|t| t.addresses.keys()))
            .map(|chain| chain.to_lowercase())
            .collect()
    }

    /// Serializable summary handed to the AI backend.
    pub fn context(&self) -> CatalogContext {
        CatalogContext {
            protocols: self.protocol_names().map(str::to_string).collect(),
            tokens: self.token_symbols().map(str::to_string).collect(),
            dependency_graph: self.dependency_graph().clone(),
        }
    }
}
