use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::first_success;
use super::session::{MinerIdentity, Session};
use crate::antelope::{Connector, LedgerApi};
use crate::pricing::PriceOracle;
use crate::translator::ChainId;

/// Keeps one live [`Session`] among an ordered list of endpoints.
pub struct EndpointManager {
    clients: Vec<Arc<dyn LedgerApi>>,
    identity: Arc<MinerIdentity>,
    session: ArcSwapOption<Session>,
}

impl EndpointManager {
    pub fn new(endpoints: &[String], connector: &dyn Connector, identity: Arc<MinerIdentity>) -> Self {
        let clients = endpoints.iter().map(|e| connector.connect(e)).collect();
        Self {
            clients,
            identity,
            session: ArcSwapOption::empty(),
        }
    }

    /// Active session, if any endpoint has answered yet.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    /// Try endpoints in order and adopt the first one that answers.
    /// When every endpoint fails the previous session stays active and
    /// `None` is returned.
    pub async fn refresh(&self) -> Option<Arc<Session>> {
        let reachable = first_success("Endpoint check", &self.clients, |client| async move {
            let info = client.get_info().await?;
            let chain_id = ChainId::from_hex(&info.chain_id).context("get_info returned a bad chain_id")?;
            Ok::<_, anyhow::Error>(chain_id)
        })
        .await;

        let Some((index, chain_id)) = reachable else {
            warn!("No endpoint reachable, keeping previous session");
            return None;
        };

        let client = self.clients[index].clone();
        let changed = match self.session.load_full() {
            Some(previous) => previous.endpoint() != client.endpoint() || previous.chain_id() != &chain_id,
            None => true,
        };
        if changed {
            info!("Using endpoint {} (chain {})", client.endpoint(), chain_id);
        } else {
            debug!("Endpoint {} still healthy", client.endpoint());
        }

        let session = Arc::new(Session::new(self.identity.clone(), chain_id, client));
        self.session.store(Some(session.clone()));
        Some(session)
    }

    /// Refresh after `initial_delay`, then again `interval` after each cycle
    /// completes. Pricing runs on the adopted endpoint within the same cycle.
    pub fn spawn_refresh_loop(
        self: Arc<Self>,
        mut oracle: PriceOracle,
        initial_delay: Duration,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                if let Some(session) = self.refresh().await {
                    oracle.refresh(session.client().as_ref()).await;
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antelope::mock::{MockConnector, MockLedger};
    use crate::antelope::FeeConfig;
    use crate::pricing::{Aggregate, FeeStrategy, OracleSettings, PriceBoard, SafetyWindow};
    use std::sync::atomic::Ordering;

    fn identity() -> Arc<MinerIdentity> {
        Arc::new(MinerIdentity {
            account: "miner".parse().unwrap(),
            permission: "active".parse().unwrap(),
            key: "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3".parse().unwrap(),
        })
    }

    fn endpoints(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_session_before_first_refresh() {
        let manager = EndpointManager::new(&endpoints(&["http://a"]), &MockConnector::default(), identity());
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn test_fails_over_to_second_endpoint_and_stays() {
        let a = MockLedger::down("http://a");
        let b = MockLedger::new("http://b");
        let connector = MockConnector::default().with(a.clone()).with(b.clone());
        let manager = EndpointManager::new(&endpoints(&["http://a", "http://b"]), &connector, identity());

        for _ in 0..3 {
            let session = manager.refresh().await.unwrap();
            assert_eq!(session.endpoint(), "http://b");
            assert_eq!(manager.current().unwrap().endpoint(), "http://b");
        }
        assert_eq!(a.info_calls.load(Ordering::SeqCst), 3);
        assert_eq!(b.info_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_success_stops_iteration() {
        let a = MockLedger::new("http://a");
        let b = MockLedger::new("http://b");
        let connector = MockConnector::default().with(a.clone()).with(b.clone());
        let manager = EndpointManager::new(&endpoints(&["http://a", "http://b"]), &connector, identity());

        manager.refresh().await.unwrap();
        assert_eq!(manager.current().unwrap().endpoint(), "http://a");
        assert_eq!(b.info_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_down_keeps_previous_session() {
        let a = MockLedger::new("http://a");
        let connector = MockConnector::default().with(a.clone());
        let manager = EndpointManager::new(&endpoints(&["http://a"]), &connector, identity());

        let adopted = manager.refresh().await.unwrap();
        *a.up.lock().unwrap() = false;
        assert!(manager.refresh().await.is_none());
        assert!(Arc::ptr_eq(&manager.current().unwrap(), &adopted));
    }

    #[tokio::test]
    async fn test_recovers_preferred_endpoint() {
        let a = MockLedger::down("http://a");
        let b = MockLedger::new("http://b");
        let connector = MockConnector::default().with(a.clone()).with(b);
        let manager = EndpointManager::new(&endpoints(&["http://a", "http://b"]), &connector, identity());

        manager.refresh().await.unwrap();
        *a.up.lock().unwrap() = true;
        let session = manager.refresh().await.unwrap();
        assert_eq!(session.endpoint(), "http://a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_publishes_prices() {
        let ledger = MockLedger::new("http://a");
        ledger.set_fee(Some(FeeConfig {
            gas_price: 42,
            evm_version: 0,
            max_queued_price: 0,
        }));
        let connector = MockConnector::default().with(ledger.clone());
        let manager = Arc::new(EndpointManager::new(&endpoints(&["http://a"]), &connector, identity()));

        let board = Arc::new(PriceBoard::default());
        let settings = OracleSettings {
            evm_account: "eosio.evm".to_string(),
            evm_scope: "eosio.evm".to_string(),
            miner_account: "miner".to_string(),
            strategy: FeeStrategy::Fixed { fee: 0 },
            gas_token_exchange_rate: 1.0,
        };
        let oracle = PriceOracle::new(
            settings,
            Vec::new(),
            SafetyWindow::new(Duration::from_secs(60), Aggregate::Min),
            board.clone(),
        );

        let handle = manager.clone().spawn_refresh_loop(oracle, Duration::from_millis(100), Duration::from_secs(5));
        assert!(manager.current().is_none());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(manager.current().unwrap().endpoint(), "http://a");
        assert_eq!(board.load().gas_price(), 42);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ledger.info_calls.load(Ordering::SeqCst), 2);
        handle.abort();
    }
}
