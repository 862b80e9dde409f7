//! Gas price sampling and the safety margins applied on top of it.

pub mod oracle;
pub mod snapshot;
pub mod window;

pub use oracle::{FeeStrategy, OracleSettings, PriceOracle, PriceState};
pub use snapshot::{PriceBoard, PricingSnapshot};
pub use window::{Aggregate, SafetyWindow};
