use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::debug;

use crate::gateway::Gateway;

/// Format an integer as a `0x`-prefixed quantity.
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Handler for eth_sendRawTransaction
pub async fn send_raw_transaction(gateway: &Gateway, params: &[Value]) -> Result<Value> {
    let raw_tx = params
        .first()
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("eth_sendRawTransaction requires a raw transaction hex string"))?;

    debug!("eth_sendRawTransaction: {} bytes", raw_tx.len().saturating_sub(2) / 2);
    let hash = gateway.send_raw_transaction(raw_tx).await?;
    Ok(Value::String(hash))
}

/// Handler for eth_gasPrice
pub async fn gas_price(gateway: &Gateway) -> Result<Value> {
    Ok(Value::String(to_quantity(gateway.gas_price())))
}

/// Handler for eth_maxPriorityFeePerGas
pub async fn max_priority_fee_per_gas(gateway: &Gateway) -> Result<Value> {
    Ok(Value::String(to_quantity(gateway.max_priority_fee_per_gas())))
}
