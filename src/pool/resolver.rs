//! Pool address resolution
//!
//! Known overrides first, then an ordered list of strategies: the factory
//! registry, CREATE2 derivation and the `PoolCreated` event log. A network
//! failure aborts resolution; any other failure moves on to the next strategy.
//! Exhausting every strategy is a normal outcome, not an error.

use alloy_primitives::{address, Address};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::create2::{compute_pool_address, sort_tokens};
use crate::chain::{Chain, ChainError, ChainReader};

/// One way of finding a pool address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Factory `getPool`
    Registry,
    /// CREATE2 from factory, token pair and fee
    Derived,
    /// Most recent matching `PoolCreated` log
    EventLog,
}

impl ResolutionStrategy {
    pub const DEFAULT_ORDER: [ResolutionStrategy; 3] = [
        ResolutionStrategy::Registry,
        ResolutionStrategy::Derived,
        ResolutionStrategy::EventLog,
    ];
}

/// Where a resolved address came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    /// Previously stored on the monitored record
    Stored,
    KnownOverride,
    Registry,
    Derived,
    EventLog,
}

impl From<ResolutionStrategy> for PoolSource {
    fn from(strategy: ResolutionStrategy) -> Self {
        match strategy {
            ResolutionStrategy::Registry => PoolSource::Registry,
            ResolutionStrategy::Derived => PoolSource::Derived,
            ResolutionStrategy::EventLog => PoolSource::EventLog,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved { address: Address, source: PoolSource },
    Unresolved,
}

impl Resolution {
    pub fn address(&self) -> Option<Address> {
        match self {
            Resolution::Resolved { address, .. } => Some(*address),
            Resolution::Unresolved => None,
        }
    }
}

type PoolKey = (Chain, Address, Address, u32);

pub struct PoolResolver {
    strategies: Vec<ResolutionStrategy>,
    known: HashMap<PoolKey, Address>,
}

impl Default for PoolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolResolver {
    /// Default strategy order with the built-in override table
    pub fn new() -> Self {
        Self {
            strategies: ResolutionStrategy::DEFAULT_ORDER.to_vec(),
            known: HashMap::new(),
        }
        .with_known_pool(
            Chain::Base,
            address!("4200000000000000000000000000000000000006"), // WETH
            address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), // USDC
            500,
            address!("d0b53D9277642d899DF5C87A3966A349A798F224"),
        )
    }

    pub fn with_strategies(mut self, strategies: Vec<ResolutionStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Pin a pool address; token order does not matter
    pub fn with_known_pool(mut self, chain: Chain, a: Address, b: Address, fee: u32, pool: Address) -> Self {
        let (token0, token1) = sort_tokens(a, b);
        self.known.insert((chain, token0, token1, fee), pool);
        self
    }

    pub fn known_pool(&self, chain: Chain, a: Address, b: Address, fee: u32) -> Option<Address> {
        let (token0, token1) = sort_tokens(a, b);
        self.known.get(&(chain, token0, token1, fee)).copied()
    }

    pub async fn resolve(
        &self,
        reader: &dyn ChainReader,
        a: Address,
        b: Address,
        fee: u32,
    ) -> Result<Resolution, ChainError> {
        let chain = reader.chain();
        let (token0, token1) = sort_tokens(a, b);

        if let Some(address) = self.known_pool(chain, token0, token1, fee) {
            debug!("Known pool for {:?}/{:?} fee {} on {}", token0, token1, fee, chain);
            return Ok(Resolution::Resolved {
                address,
                source: PoolSource::KnownOverride,
            });
        }

        for strategy in &self.strategies {
            let attempt = match strategy {
                ResolutionStrategy::Registry => reader
                    .pool_from_factory(token0, token1, fee)
                    .await
                    .map(|pool| Some(pool).filter(|p| *p != Address::ZERO)),
                ResolutionStrategy::Derived => {
                    Ok(compute_pool_address(reader.contracts().factory, token0, token1, fee))
                }
                ResolutionStrategy::EventLog => self.scan_events(reader, token0, token1, fee).await,
            };

            match attempt {
                Ok(Some(address)) => {
                    info!("Pool {:?} resolved via {:?} on {}", address, strategy, chain);
                    return Ok(Resolution::Resolved {
                        address,
                        source: (*strategy).into(),
                    });
                }
                Ok(None) => debug!("{:?} found no pool on {}", strategy, chain),
                Err(e) if e.is_network() => return Err(e),
                Err(e) => debug!("{:?} failed on {}: {}", strategy, chain, e),
            }
        }

        info!(
            "No pool address for {:?}/{:?} fee {} on {}",
            token0, token1, fee, chain
        );
        Ok(Resolution::Unresolved)
    }

    /// Canonical order first, reversed order if that finds nothing; latest log wins
    async fn scan_events(
        &self,
        reader: &dyn ChainReader,
        token0: Address,
        token1: Address,
        fee: u32,
    ) -> Result<Option<Address>, ChainError> {
        let mut pools = reader.pool_created_events(token0, token1, fee).await?;
        if pools.is_empty() {
            pools = reader.pool_created_events(token1, token0, fee).await?;
        }
        Ok(pools.last().copied().filter(|p| *p != Address::ZERO))
    }
}
