//! Diagnostic tool - Check configuration and chain connectivity
//!
//! Run with: cargo run --bin diagnose

use std::env;
use std::time::Instant;

use liquidity_guard::chain::{Chain, ChainGateway};
use liquidity_guard::config::Config;
use liquidity_guard::tokens::known_tokens;

fn mask(value: &str) -> String {
    let chars = value.chars().count();
    if chars > 50 {
        let head: String = value.chars().take(30).collect();
        let tail_start = value
            .char_indices()
            .nth(chars - 15)
            .map(|(i, _)| i)
            .unwrap_or(value.len());
        format!("{}...{}", head, &value[tail_start..])
    } else {
        value.to_string()
    }
}

/// Ask the factory for the WETH/USDC 0.05% pool as a round-trip test
async fn check_chain(gateway: &ChainGateway, chain: Chain) -> Result<String, String> {
    let reader = gateway.reader(chain).map_err(|e| e.to_string())?;
    let tokens = known_tokens(chain);
    let find = |symbol: &str| tokens.iter().find(|t| t.symbol == symbol).map(|t| t.address);

    let (Some(weth), Some(usdc)) = (find("WETH"), find("USDC")) else {
        return reader
            .token_metadata(tokens.first().map(|t| t.address).unwrap_or_default())
            .await
            .map(|meta| format!("metadata read ok ({})", meta.symbol))
            .map_err(|e| e.to_string());
    };

    let started = Instant::now();
    let pool = reader
        .pool_from_factory(weth, usdc, 500)
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!("WETH/USDC 0.05% pool {:?} in {} ms", pool, started.elapsed().as_millis()))
}

#[tokio::main]
async fn main() {
    println!("🔍 LIQUIDITY GUARD DIAGNOSTIC CHECK\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Could not load configuration: {}", e);
            return;
        }
    };

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("CHECK_INTERVAL_MINUTES", "5", "Minutes between sweeps"),
        ("RPC_TIMEOUT_SECS", "5", "Timeout per chain read"),
        ("COOLDOWN_SWEEP_MINUTES", "60", "Minutes between cooldown evictions"),
        ("APP_URL", "http://localhost:3000", "Base URL for alert links"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let marker = if env::var(key).is_err() { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    println!(
        "  TELEGRAM_BOT_TOKEN: {}",
        if config.telegram_bot_token.is_some() { "✅ Set" } else { "❌ Not set (alerts go to the log)" }
    );
    let watch = env::var("WATCH_POSITIONS").unwrap_or_default();
    println!(
        "  WATCH_POSITIONS:    {}",
        if watch.trim().is_empty() { "❌ Empty".to_string() } else { watch }
    );

    match config.validate() {
        Ok(()) => println!("\n  ✅ Configuration is valid"),
        Err(e) => println!("\n  ❌ {}", e),
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                     CHAINS                         ");
    println!("═══════════════════════════════════════════════════\n");

    let gateway = ChainGateway::from_config(&config);

    for chain in Chain::ALL {
        let Some(endpoint) = config.endpoint(chain) else {
            println!("  ⚪ {:<9} {}_RPC_URL not set", chain.name(), chain.env_prefix());
            continue;
        };

        println!("  {} ({})", chain.name(), chain.chain_id());
        println!("    RPC:              {}", mask(&endpoint.rpc_url));
        println!("    Factory:          {:?}", endpoint.factory);
        println!("    Position manager: {:?}", endpoint.position_manager);

        match check_chain(&gateway, chain).await {
            Ok(detail) => println!("    ✅ {}\n", detail),
            Err(e) => println!("    ❌ {}\n", e),
        }
    }

    println!("✅ Diagnostic complete!\n");
}
