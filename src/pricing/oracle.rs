use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::snapshot::{PriceBoard, PricingSnapshot};
use super::window::SafetyWindow;
use crate::antelope::{AccountResources, ClientError, LedgerApi};
use crate::endpoint::first_success;

/// Decimal places of the native token (CPU stake) vs. the EVM gas token.
const NATIVE_TO_GAS_TOKEN_SCALE: u128 = 100_000_000_000_000;

/// Fractional config values are applied in parts per billion.
const PPB: u128 = 1_000_000_000;

/// Ledger-side pricing inputs from one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceState {
    /// Current base price per gas unit
    pub base_price: u128,
    /// Highest upcoming base price already queued on chain
    pub max_queued_base_price: u128,
    /// 0 = legacy mode, >= 1 = dynamic fees
    pub feature_version: u64,
    /// Cost of one CPU microsecond in gas-token base units
    pub cpu_cost_per_unit: u128,
}

impl PriceState {
    pub fn dynamic_fees(&self) -> bool {
        self.feature_version >= 1
    }

    /// Base price that stays sufficient until queued price changes land.
    pub fn safe_base_price(&self) -> u128 {
        self.base_price.max(self.max_queued_base_price)
    }
}

/// Priority fee policy, selected once at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeStrategy {
    Fixed { fee: u128 },
    /// `ratio` x base price
    Proportional { ratio: f64 },
    /// CPU cost of one gas unit plus a markup
    Cpu { gas_per_us: u64, markup_percentage: f64 },
    /// Unrecognized mode name; always yields a zero fee
    Unknown(String),
}

impl FeeStrategy {
    pub fn parse(mode: &str, fixed_fee: u128, ratio: f64, gas_per_us: u64, markup_percentage: f64) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "fixed" => FeeStrategy::Fixed { fee: fixed_fee },
            "proportional" => FeeStrategy::Proportional { ratio },
            "cpu" => FeeStrategy::Cpu {
                gas_per_us: gas_per_us.max(1),
                markup_percentage,
            },
            _ => FeeStrategy::Unknown(mode.to_string()),
        }
    }

    pub fn needs_resource_market(&self) -> bool {
        matches!(self, FeeStrategy::Cpu { .. })
    }

    /// Strategy output for `state`, rounded up, never negative. Does not
    /// apply the dynamic-fee gate.
    pub fn compute(&self, state: &PriceState) -> u128 {
        match self {
            FeeStrategy::Fixed { fee } => *fee,
            FeeStrategy::Proportional { ratio } => scaled_ceil(state.base_price, *ratio, 1),
            FeeStrategy::Cpu {
                gas_per_us,
                markup_percentage,
            } => scaled_ceil(
                state.cpu_cost_per_unit,
                1.0 + markup_percentage / 100.0,
                u128::from((*gas_per_us).max(1)),
            ),
            FeeStrategy::Unknown(_) => 0,
        }
    }
}

/// `ceil(value * factor / divisor)` with `factor` rounded to parts per
/// billion, so exact products are not pushed up by float error. Negative or
/// non-finite factors yield 0.
fn scaled_ceil(value: u128, factor: f64, divisor: u128) -> u128 {
    if !factor.is_finite() || factor <= 0.0 || divisor == 0 {
        return 0;
    }
    let factor_ppb = (factor * PPB as f64).round() as u128;
    match value.checked_mul(factor_ppb) {
        Some(product) => product.div_ceil(PPB * divisor),
        // Out of integer range; precision no longer matters at this size.
        None => (value as f64 * factor / divisor as f64).ceil() as u128,
    }
}

/// Convert an account's CPU stake into the price of one CPU microsecond.
pub fn cpu_cost_per_unit(resources: &AccountResources, exchange_rate: f64) -> Option<u128> {
    if resources.cpu_limit_max == 0 {
        return None;
    }
    let stake = resources.cpu_weight.saturating_mul(NATIVE_TO_GAS_TOKEN_SCALE);
    Some(scaled_ceil(stake, exchange_rate, resources.cpu_limit_max))
}

/// Settings the oracle needs besides the ledger clients.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub evm_account: String,
    pub evm_scope: String,
    pub miner_account: String,
    pub strategy: FeeStrategy,
    pub gas_token_exchange_rate: f64,
}

/// Samples ledger fee state and publishes [`PricingSnapshot`]s.
///
/// Owned by the refresh task; the priority-fee window is only touched here.
pub struct PriceOracle {
    settings: OracleSettings,
    pricing_clients: Vec<Arc<dyn LedgerApi>>,
    window: SafetyWindow,
    board: Arc<PriceBoard>,
}

impl PriceOracle {
    pub fn new(
        settings: OracleSettings,
        pricing_clients: Vec<Arc<dyn LedgerApi>>,
        window: SafetyWindow,
        board: Arc<PriceBoard>,
    ) -> Self {
        if let FeeStrategy::Unknown(mode) = &settings.strategy {
            error!("Unknown miner fee mode {:?}, priority fee will be 0", mode);
        }
        Self {
            settings,
            pricing_clients,
            window,
            board,
        }
    }

    /// Gate the strategy output on dynamic-fee mode.
    pub fn priority_fee(&self, state: &PriceState) -> u128 {
        if !state.dynamic_fees() {
            return 0;
        }
        self.settings.strategy.compute(state)
    }

    /// Query everything one pricing pass needs from the ledger.
    pub async fn sample(&self, client: &dyn LedgerApi) -> Result<PriceState, ClientError> {
        let fee = client
            .fee_config(&self.settings.evm_account, &self.settings.evm_scope)
            .await?;

        let cpu_cost = if self.settings.strategy.needs_resource_market() {
            let resources = self.resource_market(client).await?;
            cpu_cost_per_unit(&resources, self.settings.gas_token_exchange_rate).ok_or_else(|| {
                ClientError::Decode {
                    endpoint: client.endpoint().to_string(),
                    message: format!("{} has no CPU limit", self.settings.miner_account),
                }
            })?
        } else {
            0
        };

        Ok(PriceState {
            base_price: fee.gas_price,
            max_queued_base_price: fee.max_queued_price,
            feature_version: fee.evm_version,
            cpu_cost_per_unit: cpu_cost,
        })
    }

    /// Resource sample from the dedicated pricing endpoints when configured,
    /// otherwise from the active endpoint.
    async fn resource_market(&self, client: &dyn LedgerApi) -> Result<AccountResources, ClientError> {
        let account = self.settings.miner_account.as_str();
        if self.pricing_clients.is_empty() {
            return client.resource_market(account).await;
        }
        let sampled = first_success("resource market", &self.pricing_clients, |c| async move {
            c.resource_market(account).await
        })
        .await;
        match sampled {
            Some((_, resources)) => Ok(resources),
            None => client.resource_market(account).await,
        }
    }

    /// Run one pricing pass and publish the result. Failures keep the
    /// previous snapshot; returns whether a new one was published.
    pub async fn refresh(&mut self, client: &dyn LedgerApi) -> bool {
        if let FeeStrategy::Unknown(mode) = &self.settings.strategy {
            error!("Unknown miner fee mode {:?}, priority fee will be 0", mode);
        }
        let state = match self.sample(client).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Keeping previous gas price, sampling failed: {}", e);
                return false;
            }
        };

        let priority_fee = self.priority_fee(&state);
        // Legacy mode never feeds the window.
        let priority_fee_floor = if state.dynamic_fees() {
            self.window.push(Instant::now(), priority_fee)
        } else {
            0
        };

        let snapshot = PricingSnapshot {
            state,
            priority_fee,
            priority_fee_floor,
        };
        if *self.board.load() == snapshot {
            debug!("Gas price unchanged");
        } else {
            info!(
                "Gas price: base {} (queued max {}), version {}, priority fee {} (floor {})",
                state.base_price,
                state.max_queued_base_price,
                state.feature_version,
                priority_fee,
                priority_fee_floor
            );
        }
        self.board.publish(snapshot);
        true
    }
}
