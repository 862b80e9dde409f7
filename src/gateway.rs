//! Core facade behind the JSON-RPC methods.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::antelope::Connector;
use crate::config::Config;
use crate::endpoint::{EndpointManager, MinerIdentity};
use crate::pricing::{OracleSettings, PriceBoard, PriceOracle, PricingSnapshot, SafetyWindow};
use crate::relay::{Relay, RelayError, RelaySettings};

/// Endpoint manager, pricing board and relay, wired from one [`Config`].
pub struct Gateway {
    config: Config,
    manager: Arc<EndpointManager>,
    board: Arc<PriceBoard>,
    relay: Relay,
}

impl Gateway {
    pub fn new(config: Config, connector: &dyn Connector) -> Self {
        let identity = Arc::new(MinerIdentity {
            account: config.miner_account,
            permission: config.miner_permission,
            key: config.private_key.clone(),
        });
        let manager = Arc::new(EndpointManager::new(&config.rpc_endpoints, connector, identity));
        let relay = Relay::new(RelaySettings {
            evm_account: config.evm_account,
            expire_sec: config.expire_sec,
            retry_trx: config.retry_tx,
        });
        Self {
            config,
            manager,
            board: Arc::new(PriceBoard::default()),
            relay,
        }
    }

    /// Spawn the background endpoint/pricing refresh task.
    pub fn start(&self, connector: &dyn Connector) -> JoinHandle<()> {
        let settings = OracleSettings {
            evm_account: self.config.evm_account.to_string(),
            evm_scope: self.config.evm_scope.clone(),
            miner_account: self.config.miner_account.to_string(),
            strategy: self.config.fee_strategy.clone(),
            gas_token_exchange_rate: self.config.gas_token_exchange_rate,
        };
        let pricing_clients = self
            .config
            .pricing_endpoints
            .iter()
            .map(|e| connector.connect(e))
            .collect();
        let window = SafetyWindow::new(self.config.priority_fee_window, self.config.priority_fee_aggregate);
        let oracle = PriceOracle::new(settings, pricing_clients, window, self.board.clone());

        self.manager.clone().spawn_refresh_loop(
            oracle,
            self.config.initial_refresh_delay,
            self.config.refresh_interval,
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &EndpointManager {
        &self.manager
    }

    /// Latest published pricing snapshot.
    pub fn pricing(&self) -> Arc<PricingSnapshot> {
        self.board.load()
    }

    pub fn gas_price(&self) -> u128 {
        let price = self.pricing().gas_price();
        debug!("eth_gasPrice -> {}", price);
        price
    }

    pub fn max_priority_fee_per_gas(&self) -> u128 {
        let fee = self.pricing().max_priority_fee();
        debug!("eth_maxPriorityFeePerGas -> {}", fee);
        fee
    }

    pub async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, RelayError> {
        let pricing = self.pricing();
        self.relay
            .send_raw_transaction(raw_tx, self.manager.current(), &pricing)
            .await
    }
}
