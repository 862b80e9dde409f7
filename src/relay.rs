//! Turns EVM raw transactions into signed `pushtx` actions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info};

use crate::antelope::SendOptions;
use crate::endpoint::Session;
use crate::pricing::PricingSnapshot;
use crate::translator::{content_hash, decode_payload, Name, PushTx, TranslateError};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid raw transaction: {0}")]
    InvalidPayload(#[from] TranslateError),

    #[error("error pushing #{count} evm_trx {evm_trx} from EVM miner: no active endpoint session")]
    NoSession { count: u64, evm_trx: String },

    #[error("error pushing #{count} evm_trx {evm_trx} from EVM miner: {detail}")]
    Submission {
        count: u64,
        evm_trx: String,
        detail: String,
    },
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Account of the EVM contract receiving `pushtx`
    pub evm_account: Name,
    pub expire_sec: u32,
    /// Ask the node to retry the transaction until it lands
    pub retry_trx: bool,
}

pub struct Relay {
    settings: RelaySettings,
    push_count: AtomicU64,
}

impl Relay {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            settings,
            push_count: AtomicU64::new(0),
        }
    }

    /// Relay `raw_tx` through `session` and return its `0x`-prefixed keccak hash.
    ///
    /// The minimum inclusion price is taken from `pricing`, so callers should
    /// pass the same snapshot they quoted from.
    pub async fn send_raw_transaction(
        &self,
        raw_tx: &str,
        session: Option<Arc<Session>>,
        pricing: &PricingSnapshot,
    ) -> Result<String, RelayError> {
        let started = Instant::now();
        let count = self.push_count.fetch_add(1, Ordering::Relaxed);

        let rlptx = match decode_payload(raw_tx) {
            Ok(rlptx) => rlptx,
            Err(e) => {
                error!("Error pushing #{}: {}", count, e);
                info!("Tx #{} latency {}ms", count, started.elapsed().as_millis());
                return Err(e.into());
            }
        };
        let evm_trx = content_hash(&rlptx);
        info!("Pushing tx #{}, evm_trx {}", count, evm_trx);

        let Some(session) = session else {
            error!("Error pushing #{} {}: no active session", count, evm_trx);
            info!("Tx #{} latency {}ms", count, started.elapsed().as_millis());
            return Err(RelayError::NoSession { count, evm_trx });
        };

        let identity = session.identity();
        let action = PushTx {
            miner: identity.account,
            rlptx,
            min_inclusion_price: pricing
                .min_inclusion_price()
                .map(|p| u64::try_from(p).unwrap_or(u64::MAX)),
        }
        .into_action(self.settings.evm_account, identity.authorizer());

        let options = SendOptions {
            retry_trx: self.settings.retry_trx,
        };
        let result = session
            .push(vec![action], self.settings.expire_sec, &options)
            .await;
        info!("Tx #{} latency {}ms", count, started.elapsed().as_millis());

        match result {
            Ok(response) => {
                info!("Pushed tx #{} as {}", count, response.transaction_id);
                Ok(evm_trx)
            }
            Err(e) => {
                error!("Error pushing #{} {} via {}: {}", count, evm_trx, session.endpoint(), e);
                Err(RelayError::Submission {
                    count,
                    evm_trx,
                    detail: e.detail(),
                })
            }
        }
    }
}
