//! One-shot valuation of a single position
//!
//! Run with: cargo run --bin check-position -- base 12345

use alloy_primitives::{Address, U256};
use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liquidity_guard::alerts::{format_price, format_usd};
use liquidity_guard::chain::{Chain, ChainGateway};
use liquidity_guard::config::Config;
use liquidity_guard::pool::PoolResolver;
use liquidity_guard::valuation::{PositionValuator, RangeStatus, UsdPricer, ValuationSnapshot};

#[derive(Parser)]
#[command(name = "check-position")]
#[command(about = "Value a Uniswap V3 position straight from chain state", long_about = None)]
struct Cli {
    /// Chain the position lives on (ethereum, base, arbitrum, ...)
    chain: Chain,

    /// Position NFT id
    position_id: U256,

    /// Known pool address; skips pool resolution
    #[arg(long)]
    pool: Option<Address>,

    /// Print the snapshot as JSON
    #[arg(long)]
    json: bool,
}

fn print_snapshot(snapshot: &ValuationSnapshot) {
    let status = match snapshot.range_status {
        RangeStatus::InRange => style("IN RANGE").green().bold(),
        RangeStatus::OutOfRange => style("OUT OF RANGE").red().bold(),
        RangeStatus::Unknown => style("UNKNOWN").yellow().bold(),
    };

    println!();
    println!(
        "{} {} ({:.2}%) on {}",
        style("Position").cyan().bold(),
        snapshot.pair_label(),
        snapshot.fee_percent(),
        snapshot.chain
    );
    println!("  • Id:            {}", snapshot.position_id);
    println!("  • Strategy:      {:?}", snapshot.strategy);
    match (snapshot.pool_address, snapshot.pool_source) {
        (Some(pool), Some(source)) => println!("  • Pool:          {:?} ({:?})", pool, source),
        _ => println!("  • Pool:          unresolved"),
    }
    println!("  • Status:        {}", status);
    println!(
        "  • Ticks:         {} .. {} (current {})",
        snapshot.tick_lower,
        snapshot.tick_upper,
        snapshot
            .current_tick
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
    println!("  • Price:         {}", format_price(snapshot.current_price));
    println!(
        "  • Range:         {} - {}",
        format_price(snapshot.range.lower),
        format_price(snapshot.range.upper)
    );
    println!(
        "  • Range (inv.):  {} - {}",
        format_price(snapshot.range.lower_inverted),
        format_price(snapshot.range.upper_inverted)
    );

    match &snapshot.fees {
        Some(fees) => println!(
            "  • Fees:          {:.6} {} + {:.6} {} = {}{}",
            fees.amount0,
            snapshot.token0.symbol,
            fees.amount1,
            snapshot.token1.symbol,
            format_usd(Some(fees.usd)),
            if fees.includes_accrued { "" } else { " (settled only)" }
        ),
        None => println!("  • Fees:          unknown"),
    }
    match snapshot.tvl_usd {
        Some(tvl) => println!("  • Value:         {}", format_usd(Some(tvl))),
        None => println!("  • Value:         unknown"),
    }

    if !snapshot.usd_complete {
        println!("  {}", style("⚠️  USD figures are incomplete (no price for a token)").yellow());
    }
    if !snapshot.metadata_complete {
        println!("  {}", style("⚠️  Token metadata unavailable, decimals assumed 18").yellow());
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("liquidity_guard=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let valuator = PositionValuator::new(
        ChainGateway::from_config(&config),
        PoolResolver::new(),
        UsdPricer::new(),
    );

    let snapshot = valuator.snapshot(cli.chain, cli.position_id, cli.pool).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    Ok(())
}
