//! Single-position checks and full sweeps
//!
//! A check values the position, writes the snapshot back, records a metric
//! when the range is known and sends whatever alerts the decider picks. A
//! sweep runs every active check concurrently and collects the outcomes; one
//! failing position never stops the others.

use chrono::Utc;
use eyre::{eyre, Result, WrapErr};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::store::{AlertHistoryEntry, MetricEntry, MonitoredPoolRecord, PositionStore, SnapshotUpdate};
use crate::alerts::{
    AlertContext, AlertDecider, AlertKind, CooldownTracker, CycleObservation, DeliveryOutcome,
    MessageFormatter, Notifier,
};
use crate::math::tick_to_price;
use crate::valuation::{PositionValuator, RangeStatus, Strategy, ValuationSnapshot};

/// What one check found and did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub record_id: Uuid,
    pub strategy: Strategy,
    pub previous: RangeStatus,
    pub range_status: RangeStatus,
    pub current_price: Option<f64>,
    pub fees_usd: Option<f64>,
    pub alerts: Vec<AlertKind>,
}

impl CheckOutcome {
    pub fn status_changed(&self) -> bool {
        self.previous.is_known() && self.range_status.is_known() && self.previous != self.range_status
    }
}

#[derive(Debug, Default)]
pub struct SweepSummary {
    pub outcomes: Vec<CheckOutcome>,
    pub failures: Vec<(Uuid, String)>,
}

impl SweepSummary {
    pub fn checked(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

pub struct PoolMonitor {
    valuator: PositionValuator,
    store: Arc<dyn PositionStore>,
    notifier: Arc<dyn Notifier>,
    decider: AlertDecider,
    formatter: MessageFormatter,
}

/// `a: b: c` from an error chain
fn reason(e: &eyre::Report) -> String {
    e.chain().map(|cause| cause.to_string()).collect::<Vec<_>>().join(": ")
}

impl PoolMonitor {
    pub fn new(
        valuator: PositionValuator,
        store: Arc<dyn PositionStore>,
        notifier: Arc<dyn Notifier>,
        cooldowns: Arc<CooldownTracker>,
        formatter: MessageFormatter,
    ) -> Self {
        Self {
            valuator,
            store,
            notifier,
            decider: AlertDecider::new(cooldowns),
            formatter,
        }
    }

    /// On-demand check of one record by id
    pub async fn check_position(&self, record_id: Uuid) -> Result<CheckOutcome> {
        let record = self
            .store
            .get(record_id)
            .await?
            .ok_or_else(|| eyre!("monitored pool {} not found", record_id))?;
        self.check_record(record).await
    }

    /// Check one record; a failure is also written to its alert history
    pub async fn check_record(&self, record: MonitoredPoolRecord) -> Result<CheckOutcome> {
        let record_id = record.id;
        let label = format!("position {} on {}", record.position_id, record.chain);

        match self.run_check(&record).await.wrap_err(label) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let why = reason(&e);
                error!("❌ Check of {} failed: {}", record_id, why);
                if let Err(store_err) = self
                    .store
                    .append_alert(AlertHistoryEntry::check_failed(record_id, &why))
                    .await
                {
                    warn!("Could not record failure for {}: {}", record_id, store_err);
                }
                Err(e)
            }
        }
    }

    async fn run_check(&self, record: &MonitoredPoolRecord) -> Result<CheckOutcome> {
        info!("🔍 Checking {} ({}) on {}", record.id, record.pair_label(), record.chain);

        let snapshot = self
            .valuator
            .snapshot(record.chain, record.position_id, record.pool_address)
            .await?;

        let previous = record.range_status();
        let current = snapshot.range_status;
        let fees_usd = snapshot.fees_usd().filter(|usd| usd.is_finite() && *usd > 0.0);

        self.store
            .apply_update(record.id, write_back(&snapshot, fees_usd))
            .await?;

        if let Some(in_range) = current.as_flag() {
            let metric = MetricEntry {
                record_id: record.id,
                current_price: snapshot.current_price,
                in_range,
                fees_usd,
                tvl_usd: snapshot.tvl_usd,
                recorded_at: Utc::now(),
            };
            if let Err(e) = self.store.append_metric(metric).await {
                warn!("Metric for {} not saved: {}", record.id, e);
            }
        }

        let observation = CycleObservation {
            previous,
            current,
            fees_usd,
            il_pct: record.impermanent_loss_pct,
        };
        let kinds = self
            .decider
            .decide(&record.id.to_string(), &record.alert_policy(), &observation);

        if !kinds.is_empty() {
            let ctx = alert_context(record, &snapshot, fees_usd);
            for kind in &kinds {
                self.deliver(record, *kind, &ctx).await;
            }
        }

        Ok(CheckOutcome {
            record_id: record.id,
            strategy: snapshot.strategy,
            previous,
            range_status: current,
            current_price: snapshot.current_price,
            fees_usd,
            alerts: kinds,
        })
    }

    async fn deliver(&self, record: &MonitoredPoolRecord, kind: AlertKind, ctx: &AlertContext) {
        let message = self.formatter.format(kind, ctx);
        let recipient = record.telegram_chat_id.as_deref();
        let outcome = self.notifier.send_alert(recipient, kind, &message).await;

        if let (DeliveryOutcome::Suppressed { unlink_recipient: true, .. }, Some(chat_id)) = (&outcome, recipient) {
            if let Err(e) = self.store.unlink_recipient(chat_id).await {
                warn!("Could not unlink chat {}: {}", chat_id, e);
            }
        }

        let entry = AlertHistoryEntry::from_outcome(record.id, kind, message, &outcome);
        if let Err(e) = self.store.append_alert(entry).await {
            warn!("Alert history for {} not saved: {}", record.id, e);
        }
    }

    /// Check every active record concurrently
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let records = self.store.list_active(None).await?;
        if records.is_empty() {
            info!("No active positions to check");
            return Ok(SweepSummary::default());
        }

        info!("📊 Checking {} position(s)...", records.len());

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let results = join_all(records.into_iter().map(|r| self.check_record(r))).await;

        let mut summary = SweepSummary::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(e) => summary.failures.push((id, reason(&e))),
            }
        }

        info!(
            "✅ Sweep finished: {} ok, {} failed",
            summary.succeeded(),
            summary.failed()
        );
        Ok(summary)
    }
}

/// Only known values overwrite stored ones; fees only when positive
fn write_back(snapshot: &ValuationSnapshot, fees_usd: Option<f64>) -> SnapshotUpdate {
    let symbols_known = snapshot.metadata_complete;
    SnapshotUpdate {
        checked_at: snapshot.fetched_at,
        last_in_range: snapshot.range_status.as_flag(),
        current_price: snapshot.current_price,
        fees_uncollected_usd: fees_usd,
        pool_address: snapshot.pool_address,
        token0_symbol: Some(snapshot.token0.symbol.clone()).filter(|_| symbols_known),
        token1_symbol: Some(snapshot.token1.symbol.clone()).filter(|_| symbols_known),
        fee_tier: Some(snapshot.fee_tier),
        price_lower: snapshot.range.lower,
        price_upper: snapshot.range.upper,
    }
}

/// Quotes the current price from the tick so it sits on the same scale as the
/// range bounds
fn alert_context(record: &MonitoredPoolRecord, snapshot: &ValuationSnapshot, fees_usd: Option<f64>) -> AlertContext {
    let tick_price = snapshot
        .current_tick
        .map(|tick| tick_to_price(tick, snapshot.token0.decimals, snapshot.token1.decimals))
        .filter(|price| *price > 0.0);

    AlertContext {
        record_id: record.id.to_string(),
        token0_symbol: snapshot.token0.symbol.clone(),
        token1_symbol: snapshot.token1.symbol.clone(),
        fee_tier: snapshot.fee_tier,
        chain: record.chain,
        current_tick: snapshot.current_tick,
        tick_lower: snapshot.tick_lower,
        tick_upper: snapshot.tick_upper,
        current_price: tick_price.or(snapshot.current_price).or(record.current_price),
        price_lower: snapshot.range.lower.or(record.price_lower),
        price_upper: snapshot.range.upper.or(record.price_upper),
        fees_usd,
        il_pct: record.impermanent_loss_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::chain::mock::MockChainReader;
    use crate::chain::{Chain, ChainGateway, OnChainPosition};
    use crate::monitor::InMemoryStore;
    use crate::pool::PoolResolver;
    use crate::valuation::UsdPricer;
    use alloy_primitives::{address, Address, U256};

    const TOKEN0: Address = address!("1111111111111111111111111111111111111111");
    const TOKEN1: Address = address!("2222222222222222222222222222222222222222");
    const POOL: Address = address!("3333333333333333333333333333333333333333");

    fn position() -> OnChainPosition {
        OnChainPosition {
            token0: TOKEN0,
            token1: TOKEN1,
            fee: 500,
            tick_lower: -600,
            tick_upper: 600,
            liquidity: 1_000_000_000_000,
            fee_growth_inside_last0: U256::ZERO,
            fee_growth_inside_last1: U256::ZERO,
            tokens_owed0: 0,
            tokens_owed1: 2_000_000,
        }
    }

    fn reader(current_tick: i32) -> MockChainReader {
        let mut reader = MockChainReader::new(Chain::Ethereum)
            .with_position(1, position())
            .with_token(TOKEN0, "WETH", 18)
            .with_token(TOKEN1, "USDC", 6)
            .with_pool(POOL, U256::from(1u64) << 96, current_tick);
        reader.factory = Ok(POOL);
        reader
    }

    struct Harness {
        store: Arc<InMemoryStore>,
        notifier: Arc<RecordingNotifier>,
        cooldowns: Arc<CooldownTracker>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_notifier(RecordingNotifier::new())
        }

        fn with_notifier(notifier: RecordingNotifier) -> Self {
            Self {
                store: Arc::new(InMemoryStore::new()),
                notifier: Arc::new(notifier),
                cooldowns: Arc::new(CooldownTracker::new()),
            }
        }

        fn monitor(&self, reader: MockChainReader) -> PoolMonitor {
            let valuator = PositionValuator::new(
                ChainGateway::new().with_reader(Arc::new(reader)),
                PoolResolver::new(),
                UsdPricer::new(),
            );
            PoolMonitor::new(
                valuator,
                self.store.clone(),
                self.notifier.clone(),
                self.cooldowns.clone(),
                MessageFormatter::new("http://localhost:3000"),
            )
        }
    }

    fn record(last_in_range: Option<bool>) -> MonitoredPoolRecord {
        let mut record = MonitoredPoolRecord::new("alice", Chain::Ethereum, U256::from(1u64)).with_chat("42");
        record.last_in_range = last_in_range;
        record
    }

    #[tokio::test]
    async fn test_first_check_writes_back_without_alert() {
        let h = Harness::new();
        let id = h.store.insert(record(None)).await;

        let outcome = h.monitor(reader(0)).check_position(id).await.unwrap();
        assert_eq!(outcome.range_status, RangeStatus::InRange);
        assert!(outcome.alerts.is_empty());
        assert!(!outcome.status_changed());

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.last_in_range, Some(true));
        assert_eq!(stored.pool_address, Some(POOL));
        assert_eq!(stored.token0_symbol.as_deref(), Some("WETH"));
        assert_eq!(stored.fees_uncollected_usd, Some(2.0));
        assert!(stored.current_price.is_some());
        assert!(stored.last_checked_at.is_some());

        assert_eq!(h.store.metrics().await.len(), 1);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_leaving_range_sends_one_alert() {
        let h = Harness::new();
        let id = h.store.insert(record(Some(true))).await;

        let outcome = h.monitor(reader(900)).check_position(id).await.unwrap();
        assert_eq!(outcome.alerts, vec![AlertKind::OutOfRange]);
        assert!(outcome.status_changed());

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_deref(), Some("42"));
        assert!(sent[0].2.contains("Out of Range"));

        let history = h.store.alerts().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, AlertKind::OutOfRange);
        assert!(history[0].was_delivered);
    }

    #[tokio::test]
    async fn test_out_of_range_side_with_mixed_decimals() {
        // USDC(6)/WETH(18) above its range
        let position = OnChainPosition {
            tick_lower: 190_000,
            tick_upper: 195_000,
            ..position()
        };
        let sqrt = U256::from(((98_000f64 * 1.0001f64.ln()).exp() * 2f64.powi(96)) as u128);
        let mut mixed = MockChainReader::new(Chain::Ethereum)
            .with_position(1, position)
            .with_token(TOKEN0, "USDC", 6)
            .with_token(TOKEN1, "WETH", 18)
            .with_pool(POOL, sqrt, 196_000);
        mixed.factory = Ok(POOL);

        let h = Harness::new();
        let id = h.store.insert(record(Some(true))).await;

        let outcome = h.monitor(mixed).check_position(id).await.unwrap();
        assert_eq!(outcome.range_status, RangeStatus::OutOfRange);
        assert_eq!(outcome.alerts, vec![AlertKind::OutOfRange]);

        let message = &h.notifier.sent()[0].2;
        assert!(message.contains("10.52% above"), "{}", message);
        assert!(!message.contains("below"));
        assert!(message.contains("*Current price:* $324,897,"));
    }

    #[tokio::test]
    async fn test_three_cycles_out_of_range() {
        let h = Harness::new();
        let id = h.store.insert(record(Some(true))).await;
        let monitor = h.monitor(reader(900));

        for _ in 0..3 {
            monitor.check_position(id).await.unwrap();
        }

        assert_eq!(h.notifier.kinds(), vec![AlertKind::OutOfRange]);
        assert_eq!(h.store.metrics().await.len(), 3);
    }

    #[tokio::test]
    async fn test_back_in_range_ignores_toggle() {
        let h = Harness::new();
        let mut r = record(Some(false));
        r.alert_out_of_range = false;
        let id = h.store.insert(r).await;

        let outcome = h.monitor(reader(0)).check_position(id).await.unwrap();
        assert_eq!(outcome.alerts, vec![AlertKind::BackInRange]);
    }

    #[tokio::test]
    async fn test_fee_and_il_thresholds() {
        let h = Harness::new();
        let mut r = record(Some(true));
        r.alert_fees_threshold = Some(1.5);
        r.alert_il_threshold = Some(5.0);
        r.impermanent_loss_pct = Some(6.0);
        let id = h.store.insert(r).await;

        let outcome = h.monitor(reader(0)).check_position(id).await.unwrap();
        assert_eq!(outcome.alerts, vec![AlertKind::FeesThreshold, AlertKind::IlThreshold]);
        assert_eq!(outcome.fees_usd, Some(2.0));
    }

    #[tokio::test]
    async fn test_unknown_range_leaves_price_untouched() {
        let h = Harness::new();
        let mut r = record(Some(true));
        r.current_price = Some(1234.0);
        let id = h.store.insert(r).await;

        let mut unresolved = reader(0);
        unresolved.factory = Ok(Address::ZERO);
        unresolved.contracts.factory = Address::ZERO;

        let outcome = h.monitor(unresolved).check_position(id).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::TickOnly);
        assert!(outcome.alerts.is_empty());

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.current_price, Some(1234.0));
        assert_eq!(stored.last_in_range, None);
        assert!(h.store.metrics().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_check_is_recorded() {
        let h = Harness::new();
        let mut r = record(Some(true));
        r.position_id = U256::from(99u64);
        let id = h.store.insert(r).await;

        let err = h.monitor(reader(0)).check_position(id).await.unwrap_err();
        assert!(reason(&err).contains("position 99"));

        let history = h.store.alerts().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, AlertKind::Error);
        assert!(!history[0].was_delivered);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_chat_is_unlinked() {
        let h = Harness::with_notifier(RecordingNotifier::answering(DeliveryOutcome::Suppressed {
            reason: "blocked".into(),
            unlink_recipient: true,
        }));
        let id = h.store.insert(record(Some(true))).await;

        h.monitor(reader(900)).check_position(id).await.unwrap();

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.telegram_chat_id, None);
        let history = h.store.alerts().await;
        assert!(!history[0].was_delivered);
        assert_eq!(history[0].delivery_error.as_deref(), Some("blocked"));
    }

    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let h = Harness::new();
        h.store.insert(record(None)).await;
        let mut broken = record(None);
        broken.position_id = U256::from(2u64);
        let broken_id = h.store.insert(broken).await;
        let mut paused = record(None);
        paused.is_active = false;
        h.store.insert(paused).await;

        let summary = h.monitor(reader(0)).sweep().await.unwrap();
        assert_eq!(summary.checked(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].0, broken_id);
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let h = Harness::new();
        assert!(h.monitor(reader(0)).check_position(Uuid::new_v4()).await.is_err());
    }
}
