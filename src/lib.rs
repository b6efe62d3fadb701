//! Liquidity Guard - Uniswap V3 position monitor
//!
//! Values concentrated-liquidity positions straight from chain state, tracks
//! whether they are in range and sends range, fee and impermanent-loss
//! alerts over Telegram.

pub mod alerts;
pub mod chain;
pub mod config;
pub mod math;
pub mod monitor;
pub mod pool;
pub mod tokens;
pub mod valuation;
