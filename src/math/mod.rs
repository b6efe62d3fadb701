//! Price and liquidity math
//!
//! Pure functions; no I/O.

pub mod liquidity;
pub mod price;

pub use liquidity::{amounts_for_liquidity, sqrt_ratio_at_tick};
pub use price::{
    format_units, sqrt_price_x96_to_price, sqrt_price_x96_to_ratio, tick_to_price, uint_to_f64,
};
