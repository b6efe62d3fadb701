//! Position valuation: fees, USD pricing and the strategy ladder

pub mod fees;
pub mod orchestrator;
pub mod pricing;
pub mod snapshot;

pub use fees::{compute_unclaimed_fees, FeeGrowthInputs, UnclaimedFees};
pub use orchestrator::{PoolObservation, PositionValuator, ValuationError, ValuationInputs};
pub use pricing::{PairUsdPrices, UsdPricer};
pub use snapshot::{
    FeeValuation, RangePrices, RangeStatus, Strategy, TokenAmounts, ValuationSnapshot,
};
