//! In-memory ledger used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::*;
use super::{ClientError, Connector, LedgerApi};

pub const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

pub fn chain_info() -> ChainInfo {
    ChainInfo {
        chain_id: CHAIN_ID.to_string(),
        head_block_num: 1000,
        head_block_time: "2024-05-01T12:00:00.000".to_string(),
        last_irreversible_block_num: 990,
        last_irreversible_block_id: format!("000003de{}", "ab".repeat(28)),
        ..Default::default()
    }
}

pub struct MockLedger {
    endpoint: String,
    pub up: Mutex<bool>,
    pub fee: Mutex<Option<FeeConfig>>,
    pub resources: Mutex<Option<AccountResources>>,
    /// Chain error body returned by `send_transaction`, if any
    pub reject_with: Mutex<Option<Value>>,
    pub sent: Mutex<Vec<(PackedTransaction, SendOptions)>>,
    pub info_calls: AtomicUsize,
}

impl MockLedger {
    pub fn new(endpoint: &str) -> Arc<Self> {
        Arc::new(Self {
            endpoint: endpoint.to_string(),
            up: Mutex::new(true),
            fee: Mutex::new(Some(FeeConfig {
                gas_price: 150_000_000_000,
                evm_version: 0,
                max_queued_price: 0,
            })),
            resources: Mutex::new(Some(AccountResources {
                cpu_weight: 10_000,
                cpu_limit_max: 1_000_000,
            })),
            reject_with: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            info_calls: AtomicUsize::new(0),
        })
    }

    pub fn down(endpoint: &str) -> Arc<Self> {
        let ledger = Self::new(endpoint);
        *ledger.up.lock().unwrap() = false;
        ledger
    }

    pub fn set_fee(&self, fee: Option<FeeConfig>) {
        *self.fee.lock().unwrap() = fee;
    }

    fn unavailable(&self) -> ClientError {
        ClientError::Http {
            endpoint: self.endpoint.clone(),
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_info(&self) -> Result<ChainInfo, ClientError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if *self.up.lock().unwrap() {
            Ok(chain_info())
        } else {
            Err(self.unavailable())
        }
    }

    async fn fee_config(&self, _code: &str, _scope: &str) -> Result<FeeConfig, ClientError> {
        let fee = *self.fee.lock().unwrap();
        fee.ok_or_else(|| self.unavailable())
    }

    async fn resource_market(&self, _account: &str) -> Result<AccountResources, ClientError> {
        let resources = *self.resources.lock().unwrap();
        resources.ok_or_else(|| self.unavailable())
    }

    async fn send_transaction(
        &self,
        transaction: &PackedTransaction,
        options: &SendOptions,
    ) -> Result<SendTransactionResponse, ClientError> {
        self.sent
            .lock()
            .unwrap()
            .push((transaction.clone(), *options));
        if let Some(body) = self.reject_with.lock().unwrap().clone() {
            return Err(ClientError::Ledger {
                endpoint: self.endpoint.clone(),
                body,
            });
        }
        Ok(SendTransactionResponse {
            transaction_id: "00".repeat(32),
            processed: Some(json!({ "except": null })),
        })
    }
}

/// Hands out pre-registered [`MockLedger`]s; unknown URLs are unreachable.
#[derive(Default)]
pub struct MockConnector {
    ledgers: HashMap<String, Arc<MockLedger>>,
}

impl MockConnector {
    pub fn with(mut self, ledger: Arc<MockLedger>) -> Self {
        self.ledgers.insert(ledger.endpoint.clone(), ledger);
        self
    }
}

impl Connector for MockConnector {
    fn connect(&self, endpoint: &str) -> Arc<dyn LedgerApi> {
        match self.ledgers.get(endpoint) {
            Some(ledger) => ledger.clone(),
            None => MockLedger::down(endpoint),
        }
    }
}
