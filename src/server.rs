use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use http::{header, Method};
use jsonrpsee::server::{RpcModule, Server};
use jsonrpsee::types::ErrorObjectOwned;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::antelope::Connector;
use crate::gateway::Gateway;
use crate::methods::eth;

/// JSON-RPC error code for every gateway failure.
pub const GATEWAY_ERROR_CODE: i32 = -32000;

/// Start the refresh task and serve JSON-RPC until the server stops.
pub async fn start_server(gateway: Arc<Gateway>, connector: &dyn Connector) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], gateway.config().port));

    let refresh = gateway.start(connector);
    let module = build_module(gateway)?;

    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE]);
    let middleware = tower::ServiceBuilder::new().layer(cors);

    let server = Server::builder()
        .set_http_middleware(middleware)
        .build(addr)
        .await
        .map_err(|e| anyhow!("Failed to bind server to {}: {}", addr, e))?;

    info!("EVM miner listening on http://{}", addr);

    let handle = server.start(module);

    // Wait for the server to finish (runs until shutdown signal)
    handle.stopped().await;
    refresh.abort();

    info!("EVM miner stopped");
    Ok(())
}

/// Register the relayed `eth_*` methods.
pub fn build_module(gateway: Arc<Gateway>) -> Result<RpcModule<Arc<Gateway>>> {
    let mut module = RpcModule::new(gateway);

    module.register_async_method("eth_sendRawTransaction", |params, ctx, _| async move {
        let p: Vec<serde_json::Value> = params.parse().unwrap_or_default();
        eth::send_raw_transaction(&ctx, &p)
            .await
            .map_err(|e| jsonrpsee_error(&e.to_string()))
    })?;

    module.register_async_method("eth_gasPrice", |_params, ctx, _| async move {
        eth::gas_price(&ctx)
            .await
            .map_err(|e| jsonrpsee_error(&e.to_string()))
    })?;

    module.register_async_method("eth_maxPriorityFeePerGas", |_params, ctx, _| async move {
        eth::max_priority_fee_per_gas(&ctx)
            .await
            .map_err(|e| jsonrpsee_error(&e.to_string()))
    })?;

    Ok(module)
}

/// Create a jsonrpsee error from a string message.
fn jsonrpsee_error(message: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(GATEWAY_ERROR_CODE, message.to_string(), None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antelope::mock::{MockConnector, MockLedger};
    use crate::config::Config;
    use serde_json::Value;

    fn gateway(connector: &MockConnector) -> Arc<Gateway> {
        let config = Config::from_lookup(|key| {
            let value = match key {
                "PRIVATE_KEY" => Some("5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3"),
                "MINER_ACCOUNT" => Some("miner"),
                "RPC_ENDPOINTS" => Some("http://a"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap();
        Arc::new(Gateway::new(config, connector))
    }

    #[test]
    fn test_error_code() {
        let err = jsonrpsee_error("boom");
        assert_eq!(err.code(), -32000);
        assert_eq!(err.message(), "boom");
    }

    #[tokio::test]
    async fn test_registers_only_relayed_methods() {
        let module = build_module(gateway(&MockConnector::default())).unwrap();
        let mut names: Vec<&str> = module.method_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["eth_gasPrice", "eth_maxPriorityFeePerGas", "eth_sendRawTransaction"]
        );
    }

    #[tokio::test]
    async fn test_gas_price_over_rpc() {
        let module = build_module(gateway(&MockConnector::default())).unwrap();
        let price: String = module.call("eth_gasPrice", Vec::<Value>::new()).await.unwrap();
        assert_eq!(price, "0x22ecb25c00");
        let fee: String = module
            .call("eth_maxPriorityFeePerGas", Vec::<Value>::new())
            .await
            .unwrap();
        assert_eq!(fee, "0x0");
    }

    #[tokio::test]
    async fn test_send_raw_transaction_over_rpc() {
        let connector = MockConnector::default().with(MockLedger::new("http://a"));
        let gateway = gateway(&connector);
        gateway.manager().refresh().await.unwrap();

        let module = build_module(gateway).unwrap();
        let hash: String = module
            .call("eth_sendRawTransaction", vec!["0x6001"])
            .await
            .unwrap();
        assert_eq!(hash, "0x309c67890bde4c575dc23d2cc3b5c3a3d599e312e980e9b61b5bc8f3cd87c8bb");
    }
}
