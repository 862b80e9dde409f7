use std::sync::Arc;

use arc_swap::ArcSwap;

use super::oracle::PriceState;

/// Base price served before the first successful refresh (150 gwei).
pub const INITIAL_BASE_PRICE: u128 = 0x22_ecb2_5c00;

/// Everything the RPC layer needs from one pricing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingSnapshot {
    pub state: PriceState,
    /// Strategy output for this pass
    pub priority_fee: u128,
    /// Priority-fee safety aggregate over the retention window
    pub priority_fee_floor: u128,
}

impl Default for PricingSnapshot {
    fn default() -> Self {
        Self {
            state: PriceState {
                base_price: INITIAL_BASE_PRICE,
                ..Default::default()
            },
            priority_fee: 0,
            priority_fee_floor: 0,
        }
    }
}

impl PricingSnapshot {
    /// Value served by `eth_gasPrice`.
    pub fn gas_price(&self) -> u128 {
        if self.state.dynamic_fees() {
            self.state.safe_base_price().saturating_add(self.priority_fee)
        } else {
            self.state.base_price
        }
    }

    /// Value served by `eth_maxPriorityFeePerGas`.
    pub fn max_priority_fee(&self) -> u128 {
        if self.state.dynamic_fees() {
            self.priority_fee
        } else {
            0
        }
    }

    /// Minimum inclusion price attached to `pushtx`, only in dynamic-fee mode.
    pub fn min_inclusion_price(&self) -> Option<u128> {
        self.state.dynamic_fees().then_some(self.priority_fee_floor)
    }
}

/// Latest published [`PricingSnapshot`]. Readers take one snapshot and
/// derive every value from it.
#[derive(Debug, Default)]
pub struct PriceBoard {
    current: ArcSwap<PricingSnapshot>,
}

impl PriceBoard {
    pub fn load(&self) -> Arc<PricingSnapshot> {
        self.current.load_full()
    }

    pub fn publish(&self, snapshot: PricingSnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
