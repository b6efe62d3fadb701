//! Position valuation
//!
//! Reads the position NFT, resolves its pool, fans out the pool reads once,
//! then walks the strategy ladder (`Full` -> `PoolState` -> `TickOnly`). Each
//! rung is a pure function of the same inputs and observation and either
//! produces a snapshot or declines. Only a failed position read is an error.

use alloy_primitives::{Address, U256};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fees::{compute_unclaimed_fees, FeeGrowthInputs, UnclaimedFees};
use super::pricing::UsdPricer;
use super::snapshot::{
    FeeValuation, RangePrices, RangeStatus, Strategy, TokenAmounts, ValuationSnapshot,
};
use crate::chain::{Chain, ChainError, ChainGateway, ChainReader, OnChainPosition, Slot0, TokenInfo};
use crate::math::{
    amounts_for_liquidity, format_units, sqrt_price_x96_to_price, sqrt_price_x96_to_ratio,
    tick_to_price,
};
use crate::pool::{PoolResolver, PoolSource, Resolution};
use crate::tokens;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValuationError {
    /// The position NFT itself could not be read: wrong id or unreachable manager
    #[error("position {position_id} on {chain} unavailable: {source}")]
    PositionUnavailable {
        chain: Chain,
        position_id: U256,
        #[source]
        source: ChainError,
    },

    #[error("chain {0} is not configured")]
    Unconfigured(Chain),
}

/// Position-side inputs shared by every strategy
#[derive(Debug, Clone)]
pub struct ValuationInputs {
    pub chain: Chain,
    pub position_id: U256,
    pub position: OnChainPosition,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
    pub metadata_complete: bool,
    pub pool: Resolution,
}

/// What the pool reads returned; `None` where a read failed
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolObservation {
    pub slot0: Option<Slot0>,
    pub fee_growth: Option<FeeGrowthInputs>,
}

impl Strategy {
    /// Produce a snapshot if this strategy's data requirements are met
    pub fn evaluate(
        &self,
        inputs: &ValuationInputs,
        observation: &PoolObservation,
        pricer: &UsdPricer,
    ) -> Option<ValuationSnapshot> {
        match self {
            Strategy::Full => {
                inputs.pool.address()?;
                let slot0 = observation.slot0?;
                let growth = observation.fee_growth?;
                let fees = compute_unclaimed_fees(&inputs.position, Some(&growth));
                Some(with_pool_state(*self, inputs, &slot0, fees, pricer))
            }
            Strategy::PoolState => {
                inputs.pool.address()?;
                let slot0 = observation.slot0?;
                let fees = compute_unclaimed_fees(&inputs.position, None);
                Some(with_pool_state(*self, inputs, &slot0, fees, pricer))
            }
            Strategy::TickOnly => Some(tick_only(inputs)),
        }
    }
}

pub struct PositionValuator {
    gateway: ChainGateway,
    resolver: PoolResolver,
    pricer: UsdPricer,
}

impl PositionValuator {
    pub fn new(gateway: ChainGateway, resolver: PoolResolver, pricer: UsdPricer) -> Self {
        Self {
            gateway,
            resolver,
            pricer,
        }
    }

    /// Value a position.
    ///
    /// `pool_hint` is a previously resolved pool address; when given, resolution
    /// is skipped.
    pub async fn snapshot(
        &self,
        chain: Chain,
        position_id: U256,
        pool_hint: Option<Address>,
    ) -> Result<ValuationSnapshot, ValuationError> {
        let reader = self
            .gateway
            .reader(chain)
            .map_err(|_| ValuationError::Unconfigured(chain))?;

        let position = reader
            .position(position_id)
            .await
            .map_err(|source| ValuationError::PositionUnavailable {
                chain,
                position_id,
                source,
            })?;

        if let Err(reason) = position.check_invariants() {
            warn!("Position {} on {} looks inconsistent: {}", position_id, chain, reason);
        }

        let (meta0, meta1, pool) = tokio::join!(
            token_info(reader.as_ref(), position.token0),
            token_info(reader.as_ref(), position.token1),
            self.resolve_pool(reader.as_ref(), &position, pool_hint),
        );

        let observation = match pool.address() {
            Some(address) => observe_pool(reader.as_ref(), address, &position).await,
            None => PoolObservation::default(),
        };

        let inputs = ValuationInputs {
            chain,
            position_id,
            position,
            token0: meta0.0,
            token1: meta1.0,
            metadata_complete: meta0.1 && meta1.1,
            pool,
        };

        for strategy in Strategy::LADDER {
            if let Some(snapshot) = strategy.evaluate(&inputs, &observation, &self.pricer) {
                info!(
                    "Position {} on {} valued via {:?}: {}",
                    position_id, chain, strategy, snapshot.range_status
                );
                return Ok(snapshot);
            }
            debug!("{:?} declined for position {}", strategy, position_id);
        }

        Ok(tick_only(&inputs))
    }

    /// Hint first, then the resolver. Resolution errors degrade to unresolved.
    async fn resolve_pool(
        &self,
        reader: &dyn ChainReader,
        position: &OnChainPosition,
        hint: Option<Address>,
    ) -> Resolution {
        if let Some(address) = hint.filter(|a| *a != Address::ZERO) {
            return Resolution::Resolved {
                address,
                source: PoolSource::Stored,
            };
        }

        match self
            .resolver
            .resolve(reader, position.token0, position.token1, position.fee)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!("Pool resolution failed on {}: {}", reader.chain(), e);
                Resolution::Unresolved
            }
        }
    }
}

/// Symbol and decimals from the chain, then the known-token table, then
/// `UNKNOWN`/18. The flag is false only for the last fallback.
async fn token_info(reader: &dyn ChainReader, token: Address) -> (TokenInfo, bool) {
    match reader.token_metadata(token).await {
        Ok(meta) => (
            TokenInfo {
                address: token,
                symbol: meta.symbol,
                decimals: meta.decimals,
            },
            true,
        ),
        Err(e) => {
            debug!("Metadata read for {:?} failed: {}", token, e);
            match tokens::get_token(reader.chain(), &token) {
                Some(known) => (
                    TokenInfo {
                        address: token,
                        symbol: known.symbol.to_string(),
                        decimals: known.decimals,
                    },
                    true,
                ),
                None => (
                    TokenInfo {
                        address: token,
                        symbol: "UNKNOWN".to_string(),
                        decimals: 18,
                    },
                    false,
                ),
            }
        }
    }
}

/// All pool reads at once; each failure only blanks its own field
async fn observe_pool(
    reader: &dyn ChainReader,
    pool: Address,
    position: &OnChainPosition,
) -> PoolObservation {
    let (slot0, global, lower, upper) = tokio::join!(
        reader.pool_slot0(pool),
        reader.pool_fee_growth_global(pool),
        reader.tick_info(pool, position.tick_lower),
        reader.tick_info(pool, position.tick_upper),
    );

    let slot0 = match slot0 {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("slot0 on pool {:?} failed: {}", pool, e);
            None
        }
    };

    let fee_growth = match (slot0, global, lower, upper) {
        (Some(s), Ok(global), Ok(lower), Ok(upper)) => Some(FeeGrowthInputs {
            current_tick: s.tick,
            global,
            lower,
            upper,
        }),
        (_, global, lower, upper) => {
            for err in [global.err(), lower.err(), upper.err()].into_iter().flatten() {
                debug!("Fee-growth read on pool {:?} failed: {}", pool, err);
            }
            None
        }
    };

    PoolObservation { slot0, fee_growth }
}

fn nonzero(price: f64) -> Option<f64> {
    Some(price).filter(|p| p.is_finite() && *p > 0.0)
}

fn range_prices(inputs: &ValuationInputs) -> RangePrices {
    let (d0, d1) = (inputs.token0.decimals, inputs.token1.decimals);
    let lower = nonzero(tick_to_price(inputs.position.tick_lower, d0, d1));
    let upper = nonzero(tick_to_price(inputs.position.tick_upper, d0, d1));

    RangePrices {
        lower,
        upper,
        lower_inverted: upper.map(|p| 1.0 / p),
        upper_inverted: lower.map(|p| 1.0 / p),
    }
}

fn tick_only(inputs: &ValuationInputs) -> ValuationSnapshot {
    let position = &inputs.position;

    ValuationSnapshot {
        chain: inputs.chain,
        position_id: inputs.position_id,
        strategy: Strategy::TickOnly,
        token0: inputs.token0.clone(),
        token1: inputs.token1.clone(),
        fee_tier: position.fee,
        tick_lower: position.tick_lower,
        tick_upper: position.tick_upper,
        liquidity: position.liquidity,
        pool_address: None,
        pool_source: None,
        current_tick: None,
        current_price: None,
        current_price_inverted: None,
        range: range_prices(inputs),
        range_status: RangeStatus::Unknown,
        fees: None,
        amounts: None,
        tvl_usd: None,
        usd_complete: false,
        metadata_complete: inputs.metadata_complete,
        fetched_at: Utc::now(),
    }
}

fn with_pool_state(
    strategy: Strategy,
    inputs: &ValuationInputs,
    slot0: &Slot0,
    fees: UnclaimedFees,
    pricer: &UsdPricer,
) -> ValuationSnapshot {
    let position = &inputs.position;
    let (d0, d1) = (inputs.token0.decimals, inputs.token1.decimals);

    let current_price = nonzero(sqrt_price_x96_to_price(slot0.sqrt_price_x96, d0, d1))
        .or_else(|| nonzero(tick_to_price(slot0.tick, d0, d1)));

    let range_status = RangeStatus::from_flag(Some(position.contains_tick(slot0.tick)));

    let (raw0, raw1) = amounts_for_liquidity(
        position.liquidity,
        sqrt_price_x96_to_ratio(slot0.sqrt_price_x96),
        position.tick_lower,
        position.tick_upper,
    );
    let amounts = TokenAmounts {
        amount0: raw0 / 10f64.powi(d0 as i32),
        amount1: raw1 / 10f64.powi(d1 as i32),
    };

    let prices = pricer.price_pair(&inputs.token0.symbol, &inputs.token1.symbol, current_price);

    let fee_amount0 = format_units(fees.amount0, d0);
    let fee_amount1 = format_units(fees.amount1, d1);

    ValuationSnapshot {
        chain: inputs.chain,
        position_id: inputs.position_id,
        strategy,
        token0: inputs.token0.clone(),
        token1: inputs.token1.clone(),
        fee_tier: position.fee,
        tick_lower: position.tick_lower,
        tick_upper: position.tick_upper,
        liquidity: position.liquidity,
        pool_address: inputs.pool.address(),
        pool_source: match inputs.pool {
            Resolution::Resolved { source, .. } => Some(source),
            Resolution::Unresolved => None,
        },
        current_tick: Some(slot0.tick),
        current_price,
        current_price_inverted: current_price.map(|p| 1.0 / p),
        range: range_prices(inputs),
        range_status,
        fees: Some(FeeValuation {
            raw0: fees.amount0,
            raw1: fees.amount1,
            amount0: fee_amount0,
            amount1: fee_amount1,
            includes_accrued: fees.includes_accrued,
            usd: prices.value(fee_amount0, fee_amount1),
        }),
        amounts: Some(amounts),
        tvl_usd: Some(prices.value(amounts.amount0, amounts.amount1)),
        usd_complete: prices.complete(),
        metadata_complete: inputs.metadata_complete,
        fetched_at: Utc::now(),
    }
}
