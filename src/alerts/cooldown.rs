//! Per-key alert cooldowns
//!
//! One timestamp per `{kind}_{record}` key. `try_acquire` checks and stamps
//! under the same lock so a manual check racing a scheduled sweep can only
//! send once. Entries older than a day are evicted on a timer.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Entries older than this are dropped by `evict_expired`
const RETENTION_HOURS: i64 = 24;

/// Source of "now"; swapped out in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct CooldownTracker {
    clock: Arc<dyn Clock>,
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // A panic while holding the lock cannot leave the map half-written
        self.last_fired.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cooling(last: Option<&DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
        matches!(last, Some(at) if now.signed_duration_since(*at) < window)
    }

    /// Stamp `key` and return true unless it is still cooling down
    pub fn try_acquire(&self, key: &str, window: Duration) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();

        if Self::cooling(entries.get(key), now, window) {
            trace!("Cooldown active for {}", key);
            return false;
        }

        entries.insert(key.to_string(), now);
        true
    }

    pub fn last_fired(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries older than the retention period; returns how many went
    pub fn evict_expired(&self) -> usize {
        let cutoff = self.clock.now() - Duration::hours(RETENTION_HOURS);
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, at| *at >= cutoff);
        before - entries.len()
    }

    /// Run `evict_expired` every `every` until the task is aborted
    pub fn spawn_eviction(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = tracker.evict_expired();
                if evicted > 0 {
                    debug!("Evicted {} expired cooldown entries, {} remain", evicted, tracker.len());
                }
            }
        })
    }
}

/// Clock that only moves when told to
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
