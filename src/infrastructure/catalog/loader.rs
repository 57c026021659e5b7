//! Reads the protocol, token and dependency JSON files.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::domain::models::{CatalogConfig, DependencyRecord, ProtocolRecord, TokenRecord};
use crate::services::EntityCatalog;

/// Builds the [`EntityCatalog`] from the configured record files.
///
/// A missing or malformed file is logged once and contributes no records,
/// so a broken catalog degrades lookups to "absent" instead of aborting.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load all three record files, degrading each unreadable one to empty.
    pub fn load(config: &CatalogConfig) -> EntityCatalog {
        let protocols: Vec<ProtocolRecord> = read_records(&config.protocols_path, "protocols");
        let tokens: Vec<TokenRecord> = read_records(&config.tokens_path, "tokens");
        let dependencies: Vec<DependencyRecord> =
            read_records(&config.dependencies_path, "dependencies");

        info!(
            protocols = protocols.len(),
            tokens = tokens.len(),
            dependencies = dependencies.len(),
            "entity catalog loaded"
        );
        EntityCatalog::new(protocols, tokens, dependencies)
    }
}

fn read_records<T: DeserializeOwned>(path: impl AsRef<Path>, kind: &str) -> Vec<T> {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(kind, path = %path.display(), error = %err, "catalog file unreadable, using no records");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(err) => {
            warn!(kind, path = %path.display(), error = %err, "catalog file malformed, using no records");
            Vec::new()
        }
    }
}
