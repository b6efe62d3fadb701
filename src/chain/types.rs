//! Chain identities, contract addresses and the typed shapes of on-chain reads.

use alloy_primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lowest tick representable by the protocol
pub const MIN_TICK: i32 = -887272;

/// Highest tick representable by the protocol
pub const MAX_TICK: i32 = 887272;

// ============================================
// CHAIN
// ============================================

/// Networks a monitored position can live on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Base,
    Polygon,
    Arbitrum,
    Optimism,
    Bsc,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Ethereum,
        Chain::Base,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Bsc,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Base => 8453,
            Chain::Polygon => 137,
            Chain::Arbitrum => 42161,
            Chain::Optimism => 10,
            Chain::Bsc => 56,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Bsc => "bsc",
        }
    }

    /// Prefix used for per-chain environment variables (`BASE_RPC_URL`, ...)
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETHEREUM",
            Chain::Base => "BASE",
            Chain::Polygon => "POLYGON",
            Chain::Arbitrum => "ARBITRUM",
            Chain::Optimism => "OPTIMISM",
            Chain::Bsc => "BSC",
        }
    }

    /// Canonical Uniswap V3 deployment on this chain, if there is one
    pub fn default_contracts(&self) -> Option<ChainContracts> {
        match self {
            Chain::Ethereum | Chain::Arbitrum | Chain::Optimism | Chain::Polygon => {
                Some(ChainContracts {
                    factory: address!("1F98431c8aD98523631AE4a59f267346ea31F984"),
                    position_manager: address!("C36442b4a4522E871399CD717aBDD847Ab11FE88"),
                })
            }
            Chain::Base => Some(ChainContracts {
                factory: address!("33128a8fC17869897dcE68Ed026d69B5cc496DA1"),
                position_manager: address!("03a520b32C04BF3bEEf7BEb72E919cf822Ed34f1"),
            }),
            Chain::Bsc => None,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" => Ok(Chain::Ethereum),
            "base" => Ok(Chain::Base),
            "polygon" | "matic" => Ok(Chain::Polygon),
            "arbitrum" | "arb" => Ok(Chain::Arbitrum),
            "optimism" | "op" => Ok(Chain::Optimism),
            "bsc" | "bnb" => Ok(Chain::Bsc),
            other => Err(format!("unsupported chain: {}", other)),
        }
    }
}

/// Factory and position-manager addresses for one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainContracts {
    pub factory: Address,
    pub position_manager: Address,
}

// ============================================
// READ RESULTS
// ============================================

/// A position NFT as stored by the position manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainPosition {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside_last0: U256,
    pub fee_growth_inside_last1: U256,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

impl OnChainPosition {
    /// Tick bounds ordered and inside the protocol range, tokens canonically ordered.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.tick_lower >= self.tick_upper {
            return Err(format!(
                "tickLower {} is not below tickUpper {}",
                self.tick_lower, self.tick_upper
            ));
        }
        if self.tick_lower < MIN_TICK || self.tick_upper > MAX_TICK {
            return Err(format!(
                "ticks [{}, {}] outside protocol bounds",
                self.tick_lower, self.tick_upper
            ));
        }
        if self.token0 >= self.token1 {
            return Err(format!(
                "token0 {} does not sort before token1 {}",
                self.token0, self.token1
            ));
        }
        Ok(())
    }

    /// Inclusive on both ends
    pub fn contains_tick(&self, tick: i32) -> bool {
        self.tick_lower <= tick && tick <= self.tick_upper
    }
}

/// The two fields of `slot0` the valuation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// Lifetime fee growth per unit of liquidity, Q128
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeGrowthGlobal {
    pub global0: U256,
    pub global1: U256,
}

/// Fee growth recorded on the far side of a tick at its last crossing, Q128
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickFeeGrowth {
    pub fee_growth_outside0: U256,
    pub fee_growth_outside1: U256,
}

/// ERC-20 symbol and decimals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

/// A token with its address, as carried through a valuation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(tick_lower: i32, tick_upper: i32) -> OnChainPosition {
        OnChainPosition {
            token0: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            token1: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            fee: 500,
            tick_lower,
            tick_upper,
            liquidity: 1,
            fee_growth_inside_last0: U256::ZERO,
            fee_growth_inside_last1: U256::ZERO,
            tokens_owed0: 0,
            tokens_owed1: 0,
        }
    }

    #[test]
    fn test_chain_parsing() {
        assert_eq!("Base".parse::<Chain>().unwrap(), Chain::Base);
        assert_eq!("eth".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert!("solana".parse::<Chain>().is_err());
        assert_eq!(Chain::Base.chain_id(), 8453);
    }

    #[test]
    fn test_default_contracts() {
        assert!(Chain::Ethereum.default_contracts().is_some());
        assert!(Chain::Bsc.default_contracts().is_none());
    }

    #[test]
    fn test_position_invariants() {
        assert!(position(-100, 100).check_invariants().is_ok());
        assert!(position(100, 100).check_invariants().is_err());
        assert!(position(-900_000, 100).check_invariants().is_err());

        let mut swapped = position(-100, 100);
        std::mem::swap(&mut swapped.token0, &mut swapped.token1);
        assert!(swapped.check_invariants().is_err());
    }

    #[test]
    fn test_contains_tick_is_inclusive() {
        let p = position(-60, 60);
        assert!(p.contains_tick(-60));
        assert!(p.contains_tick(60));
        assert!(!p.contains_tick(61));
    }
}
