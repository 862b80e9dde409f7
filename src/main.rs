//! EVM miner gateway
//!
//! Loads configuration from environment/.env file, keeps a session on one
//! of the configured Antelope endpoints and serves the relayed Ethereum
//! JSON-RPC methods on the configured port.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use evm_miner_gateway::antelope::HttpConnector;
use evm_miner_gateway::config::Config;
use evm_miner_gateway::gateway::Gateway;
use evm_miner_gateway::server::start_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    info!("=== EOS EVM Miner ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration:");
    info!("  Miner: {}@{}", config.miner_account, config.miner_permission);
    info!("  Public key: {}", config.private_key.public_key());
    info!("  RPC Port: {}", config.port);
    info!("  Endpoints: {}", config.rpc_endpoints.join(", "));
    if !config.pricing_endpoints.is_empty() {
        info!("  Pricing endpoints: {}", config.pricing_endpoints.join(", "));
    }
    info!("  EVM contract: {} (scope {})", config.evm_account, config.evm_scope);
    info!("  Fee mode: {:?}", config.fee_strategy);
    info!("");

    let connector = HttpConnector::new(config.request_timeout).context("Failed to build HTTP client")?;
    let gateway = Arc::new(Gateway::new(config, &connector));

    start_server(gateway, &connector).await?;

    Ok(())
}
