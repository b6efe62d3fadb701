//! Token amounts held by a concentrated-liquidity position

/// `sqrt(1.0001^tick)`
pub fn sqrt_ratio_at_tick(tick: i32) -> f64 {
    (tick as f64 * 1.0001f64.ln() / 2.0).exp()
}

/// Raw token amounts (smallest units) for `liquidity` spread over
/// `[tick_lower, tick_upper]` at the current sqrt price ratio.
///
/// Below the range everything is token0, above it everything is token1.
/// amount0 = L · (√Pb − √P) / (√P · √Pb)
/// amount1 = L · (√P − √Pa)
pub fn amounts_for_liquidity(
    liquidity: u128,
    sqrt_price: f64,
    tick_lower: i32,
    tick_upper: i32,
) -> (f64, f64) {
    let l = liquidity as f64;
    let sqrt_a = sqrt_ratio_at_tick(tick_lower.min(tick_upper));
    let sqrt_b = sqrt_ratio_at_tick(tick_lower.max(tick_upper));

    if liquidity == 0 || !(sqrt_price.is_finite() && sqrt_price > 0.0) {
        return (0.0, 0.0);
    }

    if sqrt_price <= sqrt_a {
        (l * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b), 0.0)
    } else if sqrt_price >= sqrt_b {
        (0.0, l * (sqrt_b - sqrt_a))
    } else {
        (
            l * (sqrt_b - sqrt_price) / (sqrt_price * sqrt_b),
            l * (sqrt_price - sqrt_a),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_deltas() {
        // Liquidity 1000 between price 1 and 4 (sqrt 1 to 2)
        let tick_upper = (4f64.ln() / 1.0001f64.ln()).round() as i32;

        // Below the range: all token0, L * (1/1 - 1/2) = 500
        let (a0, a1) = amounts_for_liquidity(1000, 0.5, 0, tick_upper);
        assert!((a0 - 500.0).abs() < 0.1);
        assert_eq!(a1, 0.0);

        // Above the range: all token1, L * (2 - 1) = 1000
        let (a0, a1) = amounts_for_liquidity(1000, 3.0, 0, tick_upper);
        assert_eq!(a0, 0.0);
        assert!((a1 - 1000.0).abs() < 0.1);
    }

    #[test]
    fn test_in_range_holds_both() {
        let (a0, a1) = amounts_for_liquidity(1_000_000, 1.0, -1000, 1000);
        assert!(a0 > 0.0 && a1 > 0.0);

        // Symmetric range around price 1 holds equal raw amounts
        assert!(((a0 - a1) / a1).abs() < 1e-3);
    }

    #[test]
    fn test_empty_position() {
        assert_eq!(amounts_for_liquidity(0, 1.0, -10, 10), (0.0, 0.0));
        assert_eq!(amounts_for_liquidity(10, 0.0, -10, 10), (0.0, 0.0));
    }
}
