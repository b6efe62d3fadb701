//! Unclaimed fee accounting
//!
//! Mirrors the pool's own fee-growth bookkeeping: growth inside a range is the
//! global growth minus what accrued below the lower tick and above the upper
//! tick, all in Q128 with wrapping `uint256` subtraction.

use alloy_primitives::{U256, U512};

use crate::chain::{FeeGrowthGlobal, OnChainPosition, TickFeeGrowth};

/// Pool-side inputs for the accrued part of the fees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeGrowthInputs {
    pub current_tick: i32,
    pub global: FeeGrowthGlobal,
    pub lower: TickFeeGrowth,
    pub upper: TickFeeGrowth,
}

/// Raw token amounts owed to a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnclaimedFees {
    pub amount0: U256,
    pub amount1: U256,
    /// False when only the settled `tokensOwed` amounts are included
    pub includes_accrued: bool,
}

/// Settled `tokensOwed` plus fees accrued since the last settlement.
///
/// Without pool inputs only the settled amounts are returned.
pub fn compute_unclaimed_fees(
    position: &OnChainPosition,
    pool: Option<&FeeGrowthInputs>,
) -> UnclaimedFees {
    let settled0 = U256::from(position.tokens_owed0);
    let settled1 = U256::from(position.tokens_owed1);

    let Some(pool) = pool else {
        return UnclaimedFees {
            amount0: settled0,
            amount1: settled1,
            includes_accrued: false,
        };
    };

    let inside0 = fee_growth_inside(
        pool.current_tick,
        position.tick_lower,
        position.tick_upper,
        pool.global.global0,
        pool.lower.fee_growth_outside0,
        pool.upper.fee_growth_outside0,
    );
    let inside1 = fee_growth_inside(
        pool.current_tick,
        position.tick_lower,
        position.tick_upper,
        pool.global.global1,
        pool.lower.fee_growth_outside1,
        pool.upper.fee_growth_outside1,
    );

    let accrued0 = accrued(inside0, position.fee_growth_inside_last0, position.liquidity);
    let accrued1 = accrued(inside1, position.fee_growth_inside_last1, position.liquidity);

    UnclaimedFees {
        amount0: settled0.saturating_add(accrued0),
        amount1: settled1.saturating_add(accrued1),
        includes_accrued: true,
    }
}

pub fn fee_growth_inside(
    current_tick: i32,
    tick_lower: i32,
    tick_upper: i32,
    global: U256,
    outside_lower: U256,
    outside_upper: U256,
) -> U256 {
    let below = if current_tick >= tick_lower {
        outside_lower
    } else {
        global.wrapping_sub(outside_lower)
    };
    let above = if current_tick < tick_upper {
        outside_upper
    } else {
        global.wrapping_sub(outside_upper)
    };

    global.wrapping_sub(below).wrapping_sub(above)
}

/// `(inside - last) * liquidity >> 128`, zero when the snapshot is ahead
fn accrued(inside: U256, last: U256, liquidity: u128) -> U256 {
    if inside <= last {
        return U256::ZERO;
    }

    let product = U512::from(inside - last) * U512::from(liquidity);
    // < 2^384 before the shift, so it fits 256 bits after
    (product >> 128usize).to::<U256>()
}
