//! Monitored-position persistence
//!
//! The monitor only talks to storage through `PositionStore`. The in-memory
//! implementation backs the daemon's demo mode and the tests.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::alerts::{AlertKind, AlertPolicy, DeliveryOutcome};
use crate::chain::Chain;
use crate::valuation::RangeStatus;

/// One position an owner asked us to watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredPoolRecord {
    pub id: Uuid,
    pub owner_id: String,
    /// Linked Telegram chat; `None` until the owner links one
    pub telegram_chat_id: Option<String>,
    pub chain: Chain,
    pub position_id: U256,
    /// Last resolved pool, reused as a resolution hint
    pub pool_address: Option<Address>,
    pub token0_symbol: Option<String>,
    pub token1_symbol: Option<String>,
    pub fee_tier: Option<u32>,
    pub is_active: bool,

    /// `None` until a check produced a known range status
    pub last_in_range: Option<bool>,
    pub current_price: Option<f64>,
    pub price_lower: Option<f64>,
    pub price_upper: Option<f64>,
    pub fees_uncollected_usd: Option<f64>,
    /// Supplied from outside; never computed here
    pub impermanent_loss_pct: Option<f64>,
    pub last_checked_at: Option<DateTime<Utc>>,

    pub alert_out_of_range: bool,
    pub alert_fees_threshold: Option<f64>,
    pub alert_il_threshold: Option<f64>,
}

impl MonitoredPoolRecord {
    /// Active record with out-of-range alerts on and no thresholds
    pub fn new(owner_id: impl Into<String>, chain: Chain, position_id: U256) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            telegram_chat_id: None,
            chain,
            position_id,
            pool_address: None,
            token0_symbol: None,
            token1_symbol: None,
            fee_tier: None,
            is_active: true,
            last_in_range: None,
            current_price: None,
            price_lower: None,
            price_upper: None,
            fees_uncollected_usd: None,
            impermanent_loss_pct: None,
            last_checked_at: None,
            alert_out_of_range: true,
            alert_fees_threshold: None,
            alert_il_threshold: None,
        }
    }

    pub fn with_chat(mut self, chat_id: impl Into<String>) -> Self {
        self.telegram_chat_id = Some(chat_id.into());
        self
    }

    pub fn range_status(&self) -> RangeStatus {
        RangeStatus::from_flag(self.last_in_range)
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            alert_out_of_range: self.alert_out_of_range,
            fees_threshold_usd: self.alert_fees_threshold,
            il_threshold_pct: self.alert_il_threshold,
        }
    }

    pub fn pair_label(&self) -> String {
        format!(
            "{}/{}",
            self.token0_symbol.as_deref().unwrap_or("?"),
            self.token1_symbol.as_deref().unwrap_or("?")
        )
    }
}

/// Fields a check writes back. `None` leaves the stored value untouched,
/// except `last_in_range`, which always reflects the latest check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotUpdate {
    pub checked_at: DateTime<Utc>,
    pub last_in_range: Option<bool>,
    pub current_price: Option<f64>,
    pub fees_uncollected_usd: Option<f64>,
    pub pool_address: Option<Address>,
    pub token0_symbol: Option<String>,
    pub token1_symbol: Option<String>,
    pub fee_tier: Option<u32>,
    pub price_lower: Option<f64>,
    pub price_upper: Option<f64>,
}

impl SnapshotUpdate {
    pub fn apply(self, record: &mut MonitoredPoolRecord) {
        record.last_checked_at = Some(self.checked_at);
        record.last_in_range = self.last_in_range;

        if self.current_price.is_some() {
            record.current_price = self.current_price;
        }
        if self.fees_uncollected_usd.is_some() {
            record.fees_uncollected_usd = self.fees_uncollected_usd;
        }
        if self.pool_address.is_some() {
            record.pool_address = self.pool_address;
        }
        if self.token0_symbol.is_some() {
            record.token0_symbol = self.token0_symbol;
        }
        if self.token1_symbol.is_some() {
            record.token1_symbol = self.token1_symbol;
        }
        if self.fee_tier.is_some() {
            record.fee_tier = self.fee_tier;
        }
        if self.price_lower.is_some() {
            record.price_lower = self.price_lower;
        }
        if self.price_upper.is_some() {
            record.price_upper = self.price_upper;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertHistoryEntry {
    pub record_id: Uuid,
    pub kind: AlertKind,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub was_delivered: bool,
    pub telegram_message_id: Option<i64>,
    pub delivery_error: Option<String>,
}

impl AlertHistoryEntry {
    pub fn from_outcome(record_id: Uuid, kind: AlertKind, message: String, outcome: &DeliveryOutcome) -> Self {
        Self {
            record_id,
            kind,
            message,
            sent_at: Utc::now(),
            was_delivered: outcome.is_delivered(),
            telegram_message_id: outcome.message_id(),
            delivery_error: outcome.error_text().map(str::to_string),
        }
    }

    /// A check that failed outright; nothing was sent
    pub fn check_failed(record_id: Uuid, reason: &str) -> Self {
        Self {
            record_id,
            kind: AlertKind::Error,
            message: format!("Error checking pool: {}", reason),
            sent_at: Utc::now(),
            was_delivered: false,
            telegram_message_id: None,
            delivery_error: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    pub record_id: Uuid,
    pub current_price: Option<f64>,
    pub in_range: bool,
    pub fees_usd: Option<f64>,
    pub tvl_usd: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Active records, optionally for one owner
    async fn list_active(&self, owner_id: Option<&str>) -> Result<Vec<MonitoredPoolRecord>>;

    async fn get(&self, id: Uuid) -> Result<Option<MonitoredPoolRecord>>;

    async fn apply_update(&self, id: Uuid, update: SnapshotUpdate) -> Result<()>;

    async fn append_alert(&self, entry: AlertHistoryEntry) -> Result<()>;

    async fn append_metric(&self, entry: MetricEntry) -> Result<()>;

    /// Forget a chat that blocked the bot, on every record that uses it
    async fn unlink_recipient(&self, chat_id: &str) -> Result<()>;
}

/// Entries kept per history log before the oldest are dropped
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// Process-local store for the daemon and tests.
///
/// Alert and metric logs are bounded ring buffers: once `history_limit`
/// entries are held, each append drops the oldest one. Nothing survives a
/// restart.
pub struct InMemoryStore {
    records: RwLock<HashMap<Uuid, MonitoredPoolRecord>>,
    alerts: RwLock<VecDeque<AlertHistoryEntry>>,
    metrics: RwLock<VecDeque<MetricEntry>>,
    history_limit: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Push onto a bounded log, dropping from the front when full
fn push_bounded<T>(log: &mut VecDeque<T>, entry: T, limit: usize) {
    if limit == 0 {
        return;
    }
    while log.len() >= limit {
        log.pop_front();
    }
    log.push_back(entry);
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            alerts: RwLock::new(VecDeque::new()),
            metrics: RwLock::new(VecDeque::new()),
            history_limit,
        }
    }

    pub async fn insert(&self, record: MonitoredPoolRecord) -> Uuid {
        let id = record.id;
        self.records.write().await.insert(id, record);
        id
    }

    pub async fn alerts(&self) -> Vec<AlertHistoryEntry> {
        self.alerts.read().await.iter().cloned().collect()
    }

    pub async fn metrics(&self) -> Vec<MetricEntry> {
        self.metrics.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn list_active(&self, owner_id: Option<&str>) -> Result<Vec<MonitoredPoolRecord>> {
        let records = self.records.read().await;
        let mut active: Vec<_> = records
            .values()
            .filter(|r| r.is_active)
            .filter(|r| owner_id.map_or(true, |owner| r.owner_id == owner))
            .cloned()
            .collect();
        active.sort_by_key(|r| (r.chain.chain_id(), r.position_id));
        Ok(active)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MonitoredPoolRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn apply_update(&self, id: Uuid, update: SnapshotUpdate) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| eyre!("monitored pool {} not found", id))?;
        update.apply(record);
        Ok(())
    }

    async fn append_alert(&self, entry: AlertHistoryEntry) -> Result<()> {
        push_bounded(&mut *self.alerts.write().await, entry, self.history_limit);
        Ok(())
    }

    async fn append_metric(&self, entry: MetricEntry) -> Result<()> {
        push_bounded(&mut *self.metrics.write().await, entry, self.history_limit);
        Ok(())
    }

    async fn unlink_recipient(&self, chat_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        for record in records.values_mut() {
            if record.telegram_chat_id.as_deref() == Some(chat_id) {
                record.telegram_chat_id = None;
            }
        }
        Ok(())
    }
}
