use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response from `/v1/chain/get_info`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainInfo {
    #[serde(default)]
    pub server_version: String,
    pub chain_id: String,
    pub head_block_num: u64,
    pub head_block_time: String,
    pub last_irreversible_block_num: u64,
    pub last_irreversible_block_id: String,
    #[serde(default)]
    pub head_block_producer: String,
}

/// Request body for `/v1/chain/get_table_rows`
#[derive(Debug, Serialize)]
pub struct GetTableRowsRequest<'a> {
    pub json: bool,
    pub code: &'a str,
    pub scope: &'a str,
    pub table: &'a str,
    pub limit: u32,
    pub reverse: bool,
    pub show_payer: bool,
}

impl<'a> GetTableRowsRequest<'a> {
    pub fn new(code: &'a str, scope: &'a str, table: &'a str, limit: u32) -> Self {
        Self {
            json: true,
            code,
            scope,
            table,
            limit,
            reverse: false,
            show_payer: false,
        }
    }
}

/// Response from `/v1/chain/get_table_rows`
#[derive(Debug, Deserialize)]
pub struct TableRows {
    #[serde(default)]
    pub rows: Vec<Value>,
}

/// Fee configuration of the EVM contract: the `config` row plus the
/// pending base-price changes from `pricequeue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeConfig {
    pub gas_price: u128,
    /// 0 = legacy pricing, >= 1 = dynamic fees (priority fee aware)
    pub evm_version: u64,
    /// Highest queued upcoming base price, 0 when nothing is queued
    pub max_queued_price: u128,
}

/// CPU stake and limit of an account, from `/v1/chain/get_account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountResources {
    /// Staked CPU weight in the native token's smallest unit (4 decimals)
    pub cpu_weight: u128,
    /// CPU microseconds available to the account over the accounting window
    pub cpu_limit_max: u128,
}

/// Signed transaction as accepted by `send_transaction2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackedTransaction {
    pub signatures: Vec<String>,
    pub compression: String,
    pub packed_context_free_data: String,
    pub packed_trx: String,
}

impl PackedTransaction {
    pub fn new(signature: String, packed_trx: &[u8]) -> Self {
        Self {
            signatures: vec![signature],
            compression: "none".to_string(),
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(packed_trx),
        }
    }
}

/// Submission flags for `send_transaction2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOptions {
    /// Ask the node to keep retrying the transaction until it is included
    pub retry_trx: bool,
}

/// Blocks the node waits for before answering a retried submission.
/// Without it nodeos holds the response until the transaction is irreversible.
pub const RETRY_TRX_NUM_BLOCKS: u32 = 1;

/// Request body for `/v1/chain/send_transaction2`
#[derive(Debug, Serialize)]
pub struct SendTransaction2Request<'a> {
    pub return_failure_trace: bool,
    pub retry_trx: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_trx_num_blocks: Option<u32>,
    pub transaction: &'a PackedTransaction,
}

impl<'a> SendTransaction2Request<'a> {
    pub fn new(transaction: &'a PackedTransaction, options: &SendOptions) -> Self {
        Self {
            return_failure_trace: false,
            retry_trx: options.retry_trx,
            retry_trx_num_blocks: options.retry_trx.then_some(RETRY_TRX_NUM_BLOCKS),
            transaction,
        }
    }
}

/// Response from `send_transaction2`
#[derive(Debug, Clone, Deserialize)]
pub struct SendTransactionResponse {
    pub transaction_id: String,
    #[serde(default)]
    pub processed: Option<Value>,
}

/// Read an unsigned integer that the chain API may render either as a JSON
/// number or as a decimal string (64-bit values are strings).
pub fn read_uint(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read the EVM version from a `config` row.
///
/// The field is a binary extension: it may be missing (legacy contract), a
/// plain integer, or an object carrying `cached_version`.
pub fn read_evm_version(row: &Value) -> u64 {
    let field = &row["evm_version"];
    let version = match field {
        Value::Object(obj) => obj.get("cached_version").and_then(read_uint),
        other => read_uint(other),
    };
    version.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}
