//! Common test utilities for integration tests
//!
//! Shared catalog fixtures and pipeline builders.

#![allow(dead_code)]

use std::sync::Arc;

use shieldwall::adapters::execution::SimulatedExecutionBackend;
use shieldwall::application::Bootstrap;
use shieldwall::domain::models::{Config, DependencyRecord, ProtocolRecord, TokenRecord};
use shieldwall::domain::ports::ExecutionBackend;
use shieldwall::services::EntityCatalog;

/// Uniswap exposes USDC and USDT; Aave exposes DAI, USDC and WETH.
pub fn catalog() -> EntityCatalog {
    EntityCatalog::new(
        vec![
            ProtocolRecord::new("Uniswap").with_address("ethereum", "0x1f98"),
            ProtocolRecord::new("Aave").with_address("ethereum", "0x7d2768"),
            ProtocolRecord::new("Curve").with_address("arbitrum", "0xd51a"),
        ],
        vec![
            TokenRecord::new("USDC"),
            TokenRecord::new("USDT"),
            TokenRecord::new("DAI"),
            TokenRecord::new("WETH"),
        ],
        vec![
            DependencyRecord::new("Uniswap", "USDC"),
            DependencyRecord::new("Uniswap", "USDT"),
            DependencyRecord::new("Aave", "DAI"),
            DependencyRecord::new("Aave", "USDC"),
            DependencyRecord::new("Aave", "WETH"),
        ],
    )
}

/// Config with short timers so spawned coordinators settle quickly.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.workflow.completion_delay_ms = 50;
    config.workflow.stage_timeout_ms = 2_000;
    config.feed.poll_interval_ms = 10;
    config
}

pub fn bootstrap_with(backend: Arc<dyn ExecutionBackend>) -> Bootstrap {
    Bootstrap::new(fast_config())
        .with_catalog(catalog())
        .with_backend(backend)
}

pub fn simulated() -> Arc<SimulatedExecutionBackend> {
    Arc::new(SimulatedExecutionBackend::new())
}

/// Initializes a tracing subscriber writing to the test harness.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub const BENIGN: &str = "Just released a blog post about blockchain.";
pub const UNISWAP_THREAT: &str = "CRITICAL vulnerability in Uniswap detected! USDC at risk.";
