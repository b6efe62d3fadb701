//! USD valuation policy
//!
//! Stablecoins are worth exactly $1. A volatile token paired with a
//! stablecoin takes its price from the pool. Anything else falls back to the
//! static table, and a token with no price at all is reported as missing so
//! the snapshot can be flagged USD-incomplete. No network lookups happen here.

use std::collections::HashMap;

use crate::tokens;

/// USD price per whole token for both sides of a pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairUsdPrices {
    pub token0: Option<f64>,
    pub token1: Option<f64>,
}

impl PairUsdPrices {
    pub fn complete(&self) -> bool {
        self.token0.is_some() && self.token1.is_some()
    }

    /// Missing prices count as zero
    pub fn value(&self, amount0: f64, amount1: f64) -> f64 {
        amount0 * self.token0.unwrap_or(0.0) + amount1 * self.token1.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct UsdPricer {
    static_prices: HashMap<String, f64>,
}

impl Default for UsdPricer {
    fn default() -> Self {
        Self::new()
    }
}

impl UsdPricer {
    pub fn new() -> Self {
        Self {
            static_prices: HashMap::new(),
        }
    }

    /// Add or replace a static fallback price
    pub fn with_static_price(mut self, symbol: &str, usd: f64) -> Self {
        self.static_prices.insert(symbol.to_uppercase(), usd);
        self
    }

    /// `pool_price` is token1 per token0, when known
    pub fn price_pair(&self, symbol0: &str, symbol1: &str, pool_price: Option<f64>) -> PairUsdPrices {
        let stable0 = tokens::is_stablecoin(symbol0);
        let stable1 = tokens::is_stablecoin(symbol1);
        let pool_price = pool_price.filter(|p| p.is_finite() && *p > 0.0);

        let token0 = if stable0 {
            Some(1.0)
        } else if stable1 {
            pool_price.or_else(|| self.static_price(symbol0))
        } else {
            self.static_price(symbol0)
        };

        let token1 = if stable1 {
            Some(1.0)
        } else if stable0 {
            pool_price.map(|p| 1.0 / p).or_else(|| self.static_price(symbol1))
        } else {
            self.static_price(symbol1)
        };

        PairUsdPrices { token0, token1 }
    }

    fn static_price(&self, symbol: &str) -> Option<f64> {
        self.static_prices
            .get(&symbol.to_uppercase())
            .copied()
            .or_else(|| tokens::static_usd_price(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_pair() {
        let prices = UsdPricer::new().price_pair("USDC", "DAI", Some(0.999));
        assert_eq!(prices, PairUsdPrices { token0: Some(1.0), token1: Some(1.0) });
    }

    #[test]
    fn test_volatile_against_stable_uses_pool_price() {
        let pricer = UsdPricer::new();

        let prices = pricer.price_pair("WETH", "USDC", Some(3512.5));
        assert_eq!(prices.token0, Some(3512.5));
        assert_eq!(prices.token1, Some(1.0));

        // Stable as token0: token1 is priced by the inverse
        let prices = pricer.price_pair("USDC", "WETH", Some(0.0004));
        assert!((prices.token1.unwrap() - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_static_fallback_and_missing() {
        let pricer = UsdPricer::new();

        // No pool price: static table
        let prices = pricer.price_pair("WETH", "USDC", None);
        assert_eq!(prices.token0, Some(3300.0));

        // Neither side stable: static for WBTC, nothing for PEPE
        let prices = pricer.price_pair("WBTC", "PEPE", Some(1e9));
        assert_eq!(prices.token0, Some(43000.0));
        assert_eq!(prices.token1, None);
        assert!(!prices.complete());
        assert_eq!(prices.value(1.0, 1_000_000.0), 43000.0);
    }

    #[test]
    fn test_static_override() {
        let pricer = UsdPricer::new().with_static_price("pepe", 0.00001);
        let prices = pricer.price_pair("WETH", "PEPE", None);
        assert_eq!(prices.token1, Some(0.00001));
        assert!(prices.complete());
    }
}
