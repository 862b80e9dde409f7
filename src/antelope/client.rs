use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use super::types::*;
use super::{Connector, LedgerApi};

/// Errors returned by the chain API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The node answered with a structured chain error (`{"error": {...}}`).
    #[error("{endpoint} rejected the request: {body}")]
    Ledger { endpoint: String, body: Value },

    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ClientError {
    /// Most specific human readable message the node gave for this failure.
    ///
    /// Looks at `error.details[0].message`, then `error.what`, then
    /// `error.message` / `message`, and falls back to the raw JSON.
    pub fn ledger_detail(&self) -> String {
        match self {
            ClientError::Ledger { body, .. } => {
                let err = &body["error"];
                err["details"]
                    .as_array()
                    .and_then(|details| details.first())
                    .and_then(|d| d["message"].as_str())
                    .or_else(|| err["what"].as_str())
                    .or_else(|| err["message"].as_str())
                    .or_else(|| body["message"].as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string())
            }
            other => other.to_string(),
        }
    }
}

/// Client for one Antelope chain API endpoint (`/v1/chain/*`).
#[derive(Clone)]
pub struct AntelopeClient {
    http_client: Client,
    endpoint: String,
}

impl AntelopeClient {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Reuse an existing connection pool.
    pub fn with_client(http_client: Client, endpoint: &str) -> Self {
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// POST a JSON body to a chain API path and decode the response.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoint, path);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<Value>(&text) {
                Ok(body) if body.get("error").is_some() => {
                    error!("{} returned chain error on {}: {}", self.endpoint, path, body);
                    ClientError::Ledger {
                        endpoint: self.endpoint.clone(),
                        body,
                    }
                }
                _ => {
                    error!("{} returned HTTP {} on {}: {}", self.endpoint, status, path, text);
                    ClientError::Http {
                        endpoint: self.endpoint.clone(),
                        status: status.as_u16(),
                        body: text,
                    }
                }
            });
        }

        response.json().await.map_err(|e| self.decode_error(e))
    }

    fn decode_error(&self, message: impl ToString) -> ClientError {
        ClientError::Decode {
            endpoint: self.endpoint.clone(),
            message: message.to_string(),
        }
    }

    async fn get_table_rows(&self, request: &GetTableRowsRequest<'_>) -> Result<TableRows, ClientError> {
        self.post("/v1/chain/get_table_rows", request).await
    }
}

#[async_trait]
impl LedgerApi for AntelopeClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_info(&self) -> Result<ChainInfo, ClientError> {
        self.post("/v1/chain/get_info", &json!({})).await
    }

    async fn fee_config(&self, code: &str, scope: &str) -> Result<FeeConfig, ClientError> {
        let config = self
            .get_table_rows(&GetTableRowsRequest::new(code, scope, "config", 1))
            .await?;
        let row = config
            .rows
            .first()
            .ok_or_else(|| self.decode_error(format!("{} has no config row", code)))?;
        let gas_price = read_uint(&row["gas_price"])
            .ok_or_else(|| self.decode_error(format!("malformed gas_price in {}", row)))?;
        let evm_version = read_evm_version(row);

        // The price queue only exists on contracts with dynamic fees.
        let max_queued_price = if evm_version >= 1 {
            let queue = self
                .get_table_rows(&GetTableRowsRequest::new(code, scope, "pricequeue", 100))
                .await?;
            queue
                .rows
                .iter()
                .filter_map(|r| read_uint(&r["price"]))
                .max()
                .unwrap_or(0)
        } else {
            0
        };

        Ok(FeeConfig {
            gas_price,
            evm_version,
            max_queued_price,
        })
    }

    async fn resource_market(&self, account: &str) -> Result<AccountResources, ClientError> {
        let body: Value = self
            .post("/v1/chain/get_account", &json!({ "account_name": account }))
            .await?;
        let cpu_weight = read_uint(&body["cpu_weight"])
            .ok_or_else(|| self.decode_error(format!("missing cpu_weight for {}", account)))?;
        let cpu_limit_max = read_uint(&body["cpu_limit"]["max"])
            .ok_or_else(|| self.decode_error(format!("missing cpu_limit for {}", account)))?;
        Ok(AccountResources {
            cpu_weight,
            cpu_limit_max,
        })
    }

    async fn send_transaction(
        &self,
        transaction: &PackedTransaction,
        options: &SendOptions,
    ) -> Result<SendTransactionResponse, ClientError> {
        let request = SendTransaction2Request::new(transaction, options);
        let response: SendTransactionResponse =
            self.post("/v1/chain/send_transaction2", &request).await?;

        // A trace with an exception means the node accepted the request but
        // the transaction itself failed.
        if let Some(except) = response
            .processed
            .as_ref()
            .and_then(|p| p.get("except"))
            .filter(|e| !e.is_null())
        {
            return Err(ClientError::Ledger {
                endpoint: self.endpoint.clone(),
                body: json!({ "error": except }),
            });
        }

        Ok(response)
    }
}

/// Builds [`AntelopeClient`]s sharing one HTTP connection pool.
pub struct HttpConnector {
    http_client: Client,
}

impl HttpConnector {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { http_client })
    }
}

impl Connector for HttpConnector {
    fn connect(&self, endpoint: &str) -> Arc<dyn LedgerApi> {
        Arc::new(AntelopeClient::with_client(self.http_client.clone(), endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_info_shape() {
        let server = MockServer::start_async().await;
        let lib_id = format!("0000005a{}", "0".repeat(56));
        let m = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chain/get_info");
                then.status(200).json_body(json!({
                    "server_version": "d133c641",
                    "chain_id": "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906",
                    "head_block_num": 100,
                    "head_block_time": "2024-05-01T12:00:00.500",
                    "last_irreversible_block_num": 90,
                    "last_irreversible_block_id": lib_id,
                    "head_block_producer": "eosio"
                }));
            })
            .await;

        let client = AntelopeClient::new(&server.base_url());
        let info = client.get_info().await.unwrap();
        assert_eq!(info.head_block_num, 100);
        assert_eq!(info.last_irreversible_block_num, 90);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_fee_config_reads_config_and_price_queue() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chain/get_table_rows")
                    .json_body_partial(r#"{"table": "config"}"#);
                then.status(200).json_body(json!({
                    "rows": [{"gas_price": "150000000000", "evm_version": 1}],
                    "more": false
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chain/get_table_rows")
                    .json_body_partial(r#"{"table": "pricequeue"}"#);
                then.status(200).json_body(json!({
                    "rows": [{"time": "1", "price": "160000000000"}, {"time": "2", "price": "155000000000"}],
                    "more": false
                }));
            })
            .await;

        let client = AntelopeClient::new(&server.base_url());
        let fee = client.fee_config("eosio.evm", "eosio.evm").await.unwrap();
        assert_eq!(
            fee,
            FeeConfig {
                gas_price: 150_000_000_000,
                evm_version: 1,
                max_queued_price: 160_000_000_000,
            }
        );
    }

    #[tokio::test]
    async fn test_chain_error_is_structured() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chain/send_transaction2");
                then.status(500).json_body(json!({
                    "code": 500,
                    "message": "Internal Service Error",
                    "error": {
                        "code": 3050003,
                        "name": "eosio_assert_message_exception",
                        "what": "eosio_assert_message assertion failure",
                        "details": [{"message": "assertion failure with message: invalid nonce"}]
                    }
                }));
            })
            .await;

        let client = AntelopeClient::new(&server.base_url());
        let trx = PackedTransaction::new("SIG_K1_x".to_string(), &[0x00]);
        let err = client
            .send_transaction(&trx, &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Ledger { .. }));
        assert_eq!(err.ledger_detail(), "assertion failure with message: invalid nonce");
    }

    #[tokio::test]
    async fn test_send_transaction_asks_for_one_retry_block() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chain/send_transaction2")
                    .json_body_partial(r#"{"retry_trx": true, "retry_trx_num_blocks": 1}"#);
                then.status(200).json_body(json!({
                    "transaction_id": "11".repeat(32),
                    "processed": {"except": null}
                }));
            })
            .await;

        let client = AntelopeClient::new(&server.base_url());
        let trx = PackedTransaction::new("SIG_K1_x".to_string(), &[0x00]);
        let response = client
            .send_transaction(&trx, &SendOptions { retry_trx: true })
            .await
            .unwrap();
        assert_eq!(response.transaction_id, "11".repeat(32));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_resource_market_reads_get_account() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chain/get_account")
                    .json_body_partial(r#"{"account_name": "miner"}"#);
                then.status(200).json_body(json!({
                    "account_name": "miner",
                    "cpu_weight": "250000",
                    "cpu_limit": {"used": 120, "available": 4880, "max": 5000}
                }));
            })
            .await;

        let client = AntelopeClient::new(&server.base_url());
        let resources = client.resource_market("miner").await.unwrap();
        assert_eq!(
            resources,
            AccountResources {
                cpu_weight: 250_000,
                cpu_limit_max: 5_000,
            }
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_resource_market_missing_cpu_limit() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chain/get_account");
                then.status(200).json_body(json!({
                    "account_name": "miner",
                    "cpu_weight": 250000
                }));
            })
            .await;

        let client = AntelopeClient::new(&server.base_url());
        let err = client.resource_market("miner").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(err.to_string().contains("missing cpu_limit for miner"));
    }

    #[test]
    fn test_ledger_detail_fallbacks() {
        let endpoint = "http://node".to_string();
        let what = ClientError::Ledger {
            endpoint: endpoint.clone(),
            body: json!({"error": {"what": "tx expired"}}),
        };
        assert_eq!(what.ledger_detail(), "tx expired");

        let raw = ClientError::Ledger {
            endpoint: endpoint.clone(),
            body: json!({"error": {"code": 1}}),
        };
        assert_eq!(raw.ledger_detail(), r#"{"error":{"code":1}}"#);

        let http = ClientError::Http {
            endpoint,
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(http.ledger_detail(), "http://node returned HTTP 502: bad gateway");
    }
}
