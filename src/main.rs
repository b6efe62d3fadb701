//! Liquidity Guard - position monitor daemon
//!
//! Run with: cargo run
//!
//! Watches the positions listed in WATCH_POSITIONS (`chain:id[:chat]`,
//! comma separated), checks them every CHECK_INTERVAL_MINUTES and sends
//! alerts to Telegram when TELEGRAM_BOT_TOKEN is set, to the log otherwise.

use alloy_primitives::U256;
use color_eyre::eyre::{eyre, Result};
use console::style;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liquidity_guard::alerts::{CooldownTracker, LogNotifier, MessageFormatter, Notifier, TelegramNotifier};
use liquidity_guard::chain::{Chain, ChainGateway};
use liquidity_guard::config::Config;
use liquidity_guard::monitor::{InMemoryStore, MonitoredPoolRecord, PoolMonitor, Scheduler};
use liquidity_guard::pool::PoolResolver;
use liquidity_guard::valuation::{PositionValuator, UsdPricer};

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🛡️  LIQUIDITY GUARD - Uniswap V3 Position Monitor").cyan().bold()
    );
    println!(
        "{}",
        style("    Range | Fees | Impermanent Loss | Telegram Alerts").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

/// One entry of WATCH_POSITIONS
#[derive(Debug, Clone, PartialEq)]
struct WatchEntry {
    chain: Chain,
    position_id: U256,
    chat_id: Option<String>,
}

fn parse_watch_list(raw: &str) -> Result<Vec<WatchEntry>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let chain: Chain = parts
                .next()
                .unwrap_or_default()
                .parse()
                .map_err(|e: String| eyre!("{} in '{}'", e, entry))?;
            let position_id = parts
                .next()
                .ok_or_else(|| eyre!("missing position id in '{}'", entry))?
                .trim()
                .parse::<U256>()
                .map_err(|e| eyre!("bad position id in '{}': {}", entry, e))?;
            let chat_id = parts.next().map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

            Ok(WatchEntry {
                chain,
                position_id,
                chat_id,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("liquidity_guard=info".parse()?),
        )
        .init();

    print_banner();

    // Load configuration
    let config = Config::from_env()?;

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    // Print configuration summary
    config.print_summary();
    println!();

    let gateway = ChainGateway::from_config(&config);

    // =============================================
    // WATCH LIST
    // =============================================
    let store = Arc::new(InMemoryStore::new());
    let watch = parse_watch_list(&env::var("WATCH_POSITIONS").unwrap_or_default())?;
    if watch.is_empty() {
        warn!("WATCH_POSITIONS is empty - nothing to monitor");
    }
    for entry in watch {
        if gateway.reader(entry.chain).is_err() {
            warn!(
                "Skipping position {} on {}: no {}_RPC_URL",
                entry.position_id,
                entry.chain,
                entry.chain.env_prefix()
            );
            continue;
        }
        let mut record = MonitoredPoolRecord::new("local", entry.chain, entry.position_id);
        record.telegram_chat_id = entry.chat_id;
        let id = store.insert(record).await;
        println!(
            "{} Watching position {} on {} ({})",
            style("✓").green(),
            entry.position_id,
            entry.chain,
            id
        );
    }

    // =============================================
    // ALERTING
    // =============================================
    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token.clone())?),
        None => {
            info!("TELEGRAM_BOT_TOKEN not set - alerts go to the log");
            Arc::new(LogNotifier)
        }
    };

    let cooldowns = Arc::new(CooldownTracker::new());
    let eviction = cooldowns.spawn_eviction(config.cooldown_sweep_interval());

    let valuator = PositionValuator::new(gateway, PoolResolver::new(), UsdPricer::new());
    let monitor = Arc::new(PoolMonitor::new(
        valuator,
        store,
        notifier,
        cooldowns,
        MessageFormatter::new(config.app_url.clone()),
    ));

    // =============================================
    // RUN
    // =============================================
    let scheduler = Scheduler::new(monitor, config.check_interval()).start();

    println!(
        "{}",
        style("Monitoring... press Ctrl+C to stop").green().bold()
    );

    tokio::signal::ctrl_c().await?;
    println!();
    info!("Shutting down...");

    scheduler.stop().await;
    eviction.abort();

    println!("{}", style(" ✅ STOPPED").green().bold());
    Ok(())
}
