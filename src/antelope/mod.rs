pub mod client;
pub mod types;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::{AntelopeClient, ClientError, HttpConnector};
pub use types::{
    AccountResources, ChainInfo, FeeConfig, PackedTransaction, SendOptions, SendTransactionResponse,
};

/// The subset of the Antelope chain API the gateway depends on.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Base URL this client talks to.
    fn endpoint(&self) -> &str;

    /// Chain identity and head state; doubles as the liveness check.
    async fn get_info(&self) -> Result<ChainInfo, ClientError>;

    /// Base price, EVM version and queued price changes of the EVM contract.
    async fn fee_config(&self, code: &str, scope: &str) -> Result<FeeConfig, ClientError>;

    /// CPU stake and limit of `account`.
    async fn resource_market(&self, account: &str) -> Result<AccountResources, ClientError>;

    async fn send_transaction(
        &self,
        transaction: &PackedTransaction,
        options: &SendOptions,
    ) -> Result<SendTransactionResponse, ClientError>;
}

/// Opens a [`LedgerApi`] for an endpoint URL.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Arc<dyn LedgerApi>;
}
