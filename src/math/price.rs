//! Tick and sqrt-price conversions to decimal prices (token1 per token0)

use alloy_primitives::{Uint, U256, U512};

/// Below this an adjusted tick price is assumed to have its decimal
/// adjustment applied in the wrong direction
pub const PRICE_FLOOR: f64 = 1e-10;

/// Above this an adjusted tick price is renormalized
pub const PRICE_CEILING: f64 = 1e10;

/// Price for a tick, adjusted for token decimals.
///
/// Returns `0.0` when the price cannot be computed; callers treat zero as
/// "unknown", never as a real price. Adjusted prices outside
/// `[PRICE_FLOOR, PRICE_CEILING]` are renormalized:
/// below the floor the inverse is taken with the opposite adjustment, above
/// the ceiling the unadjusted price is used if it is under the ceiling,
/// otherwise the adjusted price is divided by `10^|d1 - d0|`.
pub fn tick_to_price(tick: i32, decimals0: u8, decimals1: u8) -> f64 {
    // exp/ln form keeps |tick| up to 887272 away from powi overflow
    let raw = (tick as f64 * 1.0001f64.ln()).exp();
    let diff = decimals1 as i32 - decimals0 as i32;

    let mut adjusted = raw * 10f64.powi(diff);
    if !is_usable(adjusted) {
        return 0.0;
    }

    if adjusted < PRICE_FLOOR {
        adjusted = (1.0 / raw) * 10f64.powi(-diff);
    } else if adjusted > PRICE_CEILING {
        if raw > 0.0 && raw < PRICE_CEILING {
            adjusted = raw;
        } else if diff != 0 {
            adjusted /= 10f64.powi(diff.abs());
        }
    }

    if is_usable(adjusted) {
        adjusted
    } else {
        0.0
    }
}

/// Exact price from `slot0.sqrtPriceX96`:
/// `sqrtPriceX96² · 10^d0 / (2^192 · 10^d1)`.
///
/// Numerator and denominator are built in 512-bit integers and only the final
/// division happens in floating point. If either side would not fit 512 bits
/// (absurd decimals) the float formula is used instead.
pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256, decimals0: u8, decimals1: u8) -> f64 {
    if sqrt_price_x96.is_zero() {
        return 0.0;
    }

    let sqrt = U512::from(sqrt_price_x96);
    let exact = pow10(decimals0).and_then(|scale0| {
        let numerator = sqrt.checked_mul(sqrt)?.checked_mul(scale0)?;
        let denominator = (U512::from(1u64) << 192usize).checked_mul(pow10(decimals1)?)?;
        Some(uint_to_f64(&numerator) / uint_to_f64(&denominator))
    });

    let price = exact.unwrap_or_else(|| {
        let ratio = sqrt_price_x96_to_ratio(sqrt_price_x96);
        ratio * ratio * 10f64.powi(decimals0 as i32 - decimals1 as i32)
    });

    if is_usable(price) {
        price
    } else {
        0.0
    }
}

/// `sqrtPriceX96 / 2^96` as a float
pub fn sqrt_price_x96_to_ratio(sqrt_price_x96: U256) -> f64 {
    uint_to_f64(&sqrt_price_x96) / 2f64.powi(96)
}

/// Raw integer token amount to a human amount
pub fn format_units(amount: U256, decimals: u8) -> f64 {
    uint_to_f64(&amount) / 10f64.powi(decimals as i32)
}

/// Lossy conversion of any width unsigned integer to f64
pub fn uint_to_f64<const BITS: usize, const LIMBS: usize>(value: &Uint<BITS, LIMBS>) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18446744073709551616.0 + *limb as f64)
}

fn pow10(exp: u8) -> Option<U512> {
    U512::from(10u64).checked_pow(U512::from(exp))
}

fn is_usable(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MAX_TICK, MIN_TICK};

    fn close(a: f64, b: f64, rel: f64) -> bool {
        ((a - b) / b).abs() < rel
    }

    fn sqrt_for_tick(tick: i32) -> U256 {
        let ratio = (tick as f64 * 1.0001f64.ln() / 2.0).exp();
        U256::from((ratio * 2f64.powi(96)) as u128)
    }

    #[test]
    fn test_tick_zero() {
        assert_eq!(tick_to_price(0, 18, 18), 1.0);
        assert!(close(tick_to_price(100, 18, 18), 1.01004966, 1e-8));
    }

    #[test]
    fn test_positive_and_finite_at_bounds() {
        for (d0, d1) in [(18, 18), (18, 6), (6, 18), (8, 18), (0, 24)] {
            for tick in [MIN_TICK, -200_000, -1, 0, 1, 200_000, MAX_TICK] {
                let price = tick_to_price(tick, d0, d1);
                assert!(price.is_finite() && price > 0.0, "tick {} ({}, {})", tick, d0, d1);
            }
        }
    }

    #[test]
    fn test_monotonic_inside_band() {
        let mut last = 0.0;
        for tick in (-200_000..=200_000).step_by(997) {
            let price = tick_to_price(tick, 18, 18);
            assert!(price > last, "tick {}", tick);
            last = price;
        }

        // WETH/USDC-style decimals stay in band over realistic ticks
        let mut last = 0.0;
        for tick in (-276_000..=-184_000).step_by(601) {
            let price = tick_to_price(tick, 6, 18);
            assert!(price > last, "tick {}", tick);
            last = price;
        }
    }

    #[test]
    fn test_renormalization_bands() {
        // Below the floor: inverted
        let raw = (-250_000f64 * 1.0001f64.ln()).exp();
        assert!(raw < PRICE_FLOOR);
        assert!(close(tick_to_price(-250_000, 18, 18), 1.0 / raw, 1e-12));

        // Above the ceiling with an in-band raw price: adjustment dropped
        assert_eq!(tick_to_price(0, 6, 18), 1.0);

        // Above the ceiling with an out-of-band raw price: divided by 10^diff
        let raw = (240_000f64 * 1.0001f64.ln()).exp();
        assert!(close(tick_to_price(240_000, 6, 18), raw, 1e-9));
    }

    #[test]
    fn test_sqrt_price_at_one() {
        let q96 = U256::from(1u64) << 96;
        assert_eq!(sqrt_price_x96_to_price(q96, 18, 18), 1.0);
        assert!(close(sqrt_price_x96_to_price(q96, 18, 6), 1e12, 1e-12));
        assert_eq!(sqrt_price_x96_to_price(U256::ZERO, 18, 6), 0.0);
    }

    #[test]
    fn test_sqrt_and_tick_agree() {
        for tick in [-50_000, -1_000, 0, 1, 1_000, 50_000] {
            let from_sqrt = sqrt_price_x96_to_price(sqrt_for_tick(tick), 18, 18);
            let from_tick = tick_to_price(tick, 18, 18);
            assert!(close(from_sqrt, from_tick, 1e-6), "tick {}", tick);
        }

        // Tick 0 with 18/6 decimals: the inverted branch lands on the same value
        let q96 = U256::from(1u64) << 96;
        assert!(close(sqrt_price_x96_to_price(q96, 18, 6), tick_to_price(0, 18, 6), 1e-9));
    }

    #[test]
    fn test_sqrt_overflow_falls_back_to_float() {
        let q96 = U256::from(1u64) << 96;
        assert!(close(sqrt_price_x96_to_price(q96, 200, 200), 1.0, 1e-9));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), 1.5);
        let big = U256::from(3u64) * U256::from(10u64).pow(U256::from(18u64));
        assert!(close(format_units(big, 18), 3.0, 1e-12));
    }
}
