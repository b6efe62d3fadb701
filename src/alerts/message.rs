//! Telegram Markdown alert bodies

use crate::chain::Chain;

use super::detector::AlertKind;

/// Everything a message may mention about one monitored position
#[derive(Debug, Clone, PartialEq)]
pub struct AlertContext {
    pub record_id: String,
    pub token0_symbol: String,
    pub token1_symbol: String,
    pub fee_tier: u32,
    pub chain: Chain,
    pub current_tick: Option<i32>,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub current_price: Option<f64>,
    pub price_lower: Option<f64>,
    pub price_upper: Option<f64>,
    pub fees_usd: Option<f64>,
    pub il_pct: Option<f64>,
}

impl AlertContext {
    fn pair(&self) -> String {
        format!("{}/{}", self.token0_symbol, self.token1_symbol)
    }

    /// Relative distance from the nearest range bound, from ticks.
    ///
    /// Does not depend on token decimals or on the scale of the quoted
    /// prices. Negative below the range, positive above, `None` inside or
    /// when the current tick is unknown.
    pub fn range_distance_pct(&self) -> Option<f64> {
        let tick = self.current_tick?;
        if tick < self.tick_lower {
            Some((tick_ratio(tick - self.tick_lower) - 1.0) * 100.0)
        } else if tick > self.tick_upper {
            Some((tick_ratio(tick - self.tick_upper) - 1.0) * 100.0)
        } else {
            None
        }
    }
}

/// `1.0001^ticks`
fn tick_ratio(ticks: i32) -> f64 {
    (ticks as f64 * 1.0001f64.ln()).exp()
}

pub struct MessageFormatter {
    app_url: String,
}

impl MessageFormatter {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn pool_url(&self, record_id: &str) -> String {
        format!("{}/pools/{}", self.app_url, record_id)
    }

    pub fn format(&self, kind: AlertKind, ctx: &AlertContext) -> String {
        match kind {
            AlertKind::OutOfRange => self.out_of_range(ctx),
            AlertKind::BackInRange => self.back_in_range(ctx),
            AlertKind::FeesThreshold => self.fees(ctx),
            AlertKind::IlThreshold => self.impermanent_loss(ctx),
            AlertKind::Error => format!("Check failed for {}", ctx.pair()),
        }
    }

    pub fn out_of_range(&self, ctx: &AlertContext) -> String {
        let distance = match ctx.range_distance_pct() {
            Some(pct) if pct < 0.0 => format!("\n📉 *{:.2}% below* the range minimum", -pct),
            Some(pct) => format!("\n📈 *{:.2}% above* the range maximum", pct),
            None => String::new(),
        };

        format!(
            "🚨 *ALERT: Pool Out of Range!*\n\n\
             *Pool:* {} ({:.2}%)\n\
             *Chain:* {}\n\
             *Protocol:* Uniswap V3\n\n\
             💰 *Current price:* {}{}\n\
             📊 *Your range:* {} - {}\n\n\
             ⚠️ *You are NOT earning fees!*\n\n\
             *Suggested actions:*\n\
             • Rebalance your position\n\
             • Wait for the price to return\n\
             • Review impermanent loss\n\n\
             [View details]({})",
            ctx.pair(),
            ctx.fee_tier as f64 / 10_000.0,
            ctx.chain,
            format_price(ctx.current_price),
            distance,
            format_price(ctx.price_lower),
            format_price(ctx.price_upper),
            self.pool_url(&ctx.record_id),
        )
    }

    pub fn back_in_range(&self, ctx: &AlertContext) -> String {
        format!(
            "✅ *Pool Back in Range!*\n\n\
             *Pool:* {}\n\
             *Current price:* {}\n\n\
             Your position is *IN RANGE* again and earning fees!\n\n\
             [View details]({})",
            ctx.pair(),
            format_price(ctx.current_price),
            self.pool_url(&ctx.record_id),
        )
    }

    pub fn fees(&self, ctx: &AlertContext) -> String {
        format!(
            "💰 *Fees Accumulated!*\n\n\
             *Pool:* {}\n\
             *Uncollected fees:* {}\n\n\
             You reached your configured fee threshold.\n\
             Consider collecting your earnings!\n\n\
             [View pool]({})",
            ctx.pair(),
            format_usd(ctx.fees_usd),
            self.pool_url(&ctx.record_id),
        )
    }

    pub fn impermanent_loss(&self, ctx: &AlertContext) -> String {
        let il = ctx.il_pct.unwrap_or(0.0);
        let emoji = if il > 10.0 { "⚠️" } else { "📊" };

        format!(
            "{} *Impermanent Loss Alert*\n\n\
             *Pool:* {}\n\
             *Current IL:* {:.2}%\n\n\
             Your IL crossed the configured threshold.\n\
             Consider whether the position is still worth holding.\n\n\
             [Analyse position]({})",
            emoji,
            ctx.pair(),
            il,
            self.pool_url(&ctx.record_id),
        )
    }
}

/// `1234567.891` -> `1,234,567.89`
fn with_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

/// Price with precision chosen by magnitude; zero and unknown print `N/A`
pub fn format_price(price: Option<f64>) -> String {
    match price {
        None => "N/A".to_string(),
        Some(p) if p == 0.0 || !p.is_finite() => "N/A".to_string(),
        Some(p) if p >= 1000.0 => format!("${}", with_thousands(p)),
        Some(p) if p >= 1.0 => format!("${:.4}", p),
        Some(p) if p >= 0.0001 => format!("${:.6}", p),
        Some(p) => format!("${:.2e}", p),
    }
}

pub fn format_usd(value: Option<f64>) -> String {
    match value {
        Some(v) if v != 0.0 && v.is_finite() => format!("${}", with_thousands(v)),
        _ => "$0.00".to_string(),
    }
}
