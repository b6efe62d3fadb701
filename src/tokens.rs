//! Token definitions for Liquidity Guard
//!
//! Well-known tokens per chain (used when an ERC-20 metadata read fails),
//! the stablecoin set valued at exactly $1 and the static fallback USD table.

use alloy_primitives::{address, Address};

use crate::chain::Chain;

/// A token we know without asking the chain
#[derive(Debug, Clone)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

/// Symbols valued at $1 without any lookup
pub const STABLECOINS: [&str; 5] = ["USDC", "USDT", "DAI", "BUSD", "FRAX"];

/// Last-resort USD prices, by symbol
const STATIC_USD_PRICES: [(&str, f64); 4] = [
    ("WETH", 3300.0),
    ("ETH", 3300.0),
    ("WBTC", 43000.0),
    ("BTC", 43000.0),
];

fn token(symbol: &'static str, address: Address, decimals: u8) -> Token {
    Token {
        symbol,
        address,
        decimals,
    }
}

// ============================================
// PER-CHAIN TOKENS
// ============================================

pub fn known_tokens(chain: Chain) -> Vec<Token> {
    match chain {
        Chain::Ethereum => vec![
            token("WETH", address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), 18),
            token("USDC", address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), 6),
            token("USDT", address!("dAC17F958D2ee523a2206206994597C13D831ec7"), 6),
            token("DAI", address!("6B175474E89094C44Da98b954EedcdeCB5BE3830"), 18),
            token("FRAX", address!("853d955aCEf822Db058eb8505911ED77F175b99e"), 18),
            token("WBTC", address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"), 8),
        ],
        Chain::Base => vec![
            token("WETH", address!("4200000000000000000000000000000000000006"), 18),
            token("USDC", address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), 6),
            token("DAI", address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb"), 18),
        ],
        Chain::Arbitrum => vec![
            token("WETH", address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"), 18),
            token("USDC", address!("af88d065e77c8cC2239327C5EDb3A432268e5831"), 6),
            token("USDT", address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), 6),
            token("WBTC", address!("2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f"), 8),
        ],
        Chain::Optimism => vec![
            token("WETH", address!("4200000000000000000000000000000000000006"), 18),
            token("USDC", address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85"), 6),
        ],
        Chain::Polygon => vec![
            token("WETH", address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"), 18),
            token("USDC", address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359"), 6),
            token("USDT", address!("c2132D05D31c914a87C6611C10748AEb04B58e8F"), 6),
        ],
        Chain::Bsc => vec![
            token("BUSD", address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56"), 18),
            token("USDT", address!("55d398326f99059fF775485246999027B3197955"), 18),
        ],
    }
}

/// Known token on a chain by address
pub fn get_token(chain: Chain, token: &Address) -> Option<Token> {
    known_tokens(chain).into_iter().find(|t| t.address == *token)
}

/// Case-insensitive stablecoin check by symbol
pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.iter().any(|s| s.eq_ignore_ascii_case(symbol))
}

/// Static USD price by symbol, if we carry one
pub fn static_usd_price(symbol: &str) -> Option<f64> {
    STATIC_USD_PRICES
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, price)| *price)
}
