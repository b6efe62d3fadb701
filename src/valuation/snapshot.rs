use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chain::{Chain, TokenInfo};
use crate::pool::PoolSource;

/// Range membership; `Unknown` when the current tick could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    InRange,
    OutOfRange,
    Unknown,
}

impl RangeStatus {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => RangeStatus::InRange,
            Some(false) => RangeStatus::OutOfRange,
            None => RangeStatus::Unknown,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            RangeStatus::InRange => Some(true),
            RangeStatus::OutOfRange => Some(false),
            RangeStatus::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != RangeStatus::Unknown
    }
}

impl std::fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeStatus::InRange => write!(f, "in range"),
            RangeStatus::OutOfRange => write!(f, "out of range"),
            RangeStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which rung of the valuation ladder produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Pool state plus tick fee-growth: accrued fees included
    Full,
    /// Pool state only: settled fees only
    PoolState,
    /// No pool contact: range prices only
    TickOnly,
}

impl Strategy {
    /// Evaluation order
    pub const LADDER: [Strategy; 3] = [Strategy::Full, Strategy::PoolState, Strategy::TickOnly];
}

/// Range bounds as prices
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RangePrices {
    /// token1 per token0 at `tick_lower`
    pub lower: Option<f64>,
    /// token1 per token0 at `tick_upper`
    pub upper: Option<f64>,
    /// token0 per token1; bounds swap on inversion
    pub lower_inverted: Option<f64>,
    pub upper_inverted: Option<f64>,
}

/// Fees owed to the position in whole tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeValuation {
    pub raw0: U256,
    pub raw1: U256,
    pub amount0: f64,
    pub amount1: f64,
    /// False when only settled `tokensOwed` are counted
    pub includes_accrued: bool,
    pub usd: f64,
}

/// Tokens held by the position's liquidity at the current price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenAmounts {
    pub amount0: f64,
    pub amount1: f64,
}

/// Everything derived about a position in one check.
///
/// Fields that depend on pool contact are `None` when that contact failed;
/// `None` never means zero.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationSnapshot {
    pub chain: Chain,
    pub position_id: U256,
    pub strategy: Strategy,

    pub token0: TokenInfo,
    pub token1: TokenInfo,
    pub fee_tier: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,

    pub pool_address: Option<Address>,
    pub pool_source: Option<PoolSource>,

    pub current_tick: Option<i32>,
    /// token1 per token0
    pub current_price: Option<f64>,
    pub current_price_inverted: Option<f64>,
    pub range: RangePrices,
    pub range_status: RangeStatus,

    pub fees: Option<FeeValuation>,
    pub amounts: Option<TokenAmounts>,
    pub tvl_usd: Option<f64>,

    /// Both token USD prices were known
    pub usd_complete: bool,
    /// Both tokens' symbol/decimals came from the chain or the known-token table
    pub metadata_complete: bool,

    pub fetched_at: DateTime<Utc>,
}

impl ValuationSnapshot {
    pub fn fees_usd(&self) -> Option<f64> {
        self.fees.map(|f| f.usd)
    }

    pub fn pair_label(&self) -> String {
        format!("{}/{}", self.token0.symbol, self.token1.symbol)
    }

    /// Fee tier as a percentage (500 -> 0.05)
    pub fn fee_percent(&self) -> f64 {
        self.fee_tier as f64 / 10_000.0
    }
}
