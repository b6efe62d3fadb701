//! Alert decisions
//!
//! The range state machine fires only on a known-to-known change of range
//! membership. Fee and IL thresholds are evaluated on every cycle. Every
//! kind has its own cooldown key, so several kinds can fire in one cycle.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::cooldown::CooldownTracker;
use crate::valuation::RangeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OutOfRange,
    BackInRange,
    FeesThreshold,
    IlThreshold,
    /// A check that could not complete; recorded, never sent
    Error,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::OutOfRange => "out_of_range",
            AlertKind::BackInRange => "back_in_range",
            AlertKind::FeesThreshold => "fees_threshold",
            AlertKind::IlThreshold => "il_threshold",
            AlertKind::Error => "error",
        }
    }

    /// Minimum gap between two alerts of this kind for one position
    pub fn cooldown(&self) -> Duration {
        match self {
            AlertKind::OutOfRange => Duration::minutes(60),
            AlertKind::BackInRange => Duration::minutes(30),
            AlertKind::FeesThreshold => Duration::minutes(180),
            AlertKind::IlThreshold => Duration::minutes(360),
            AlertKind::Error => Duration::zero(),
        }
    }

    pub fn cooldown_key(&self, record_id: &str) -> String {
        format!("{}_{}", self.as_str(), record_id)
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the owner asked to be told about
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlertPolicy {
    pub alert_out_of_range: bool,
    pub fees_threshold_usd: Option<f64>,
    pub il_threshold_pct: Option<f64>,
}

/// One monitoring cycle's view of a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleObservation {
    pub previous: RangeStatus,
    pub current: RangeStatus,
    pub fees_usd: Option<f64>,
    pub il_pct: Option<f64>,
}

/// Range transition alone, ignoring toggles and cooldowns
pub fn range_transition(previous: RangeStatus, current: RangeStatus) -> Option<AlertKind> {
    match (previous, current) {
        (RangeStatus::InRange, RangeStatus::OutOfRange) => Some(AlertKind::OutOfRange),
        (RangeStatus::OutOfRange, RangeStatus::InRange) => Some(AlertKind::BackInRange),
        _ => None,
    }
}

fn crosses(value: Option<f64>, threshold: Option<f64>) -> bool {
    match (value, threshold) {
        (Some(value), Some(threshold)) => threshold > 0.0 && value >= threshold,
        _ => false,
    }
}

pub struct AlertDecider {
    cooldowns: Arc<CooldownTracker>,
}

impl AlertDecider {
    pub fn new(cooldowns: Arc<CooldownTracker>) -> Self {
        Self { cooldowns }
    }

    /// Kinds to send this cycle. Each returned kind has already claimed its
    /// cooldown slot.
    pub fn decide(
        &self,
        record_id: &str,
        policy: &AlertPolicy,
        observation: &CycleObservation,
    ) -> Vec<AlertKind> {
        let mut candidates = Vec::with_capacity(3);

        match range_transition(observation.previous, observation.current) {
            Some(AlertKind::OutOfRange) if policy.alert_out_of_range => {
                candidates.push(AlertKind::OutOfRange)
            }
            Some(AlertKind::BackInRange) => candidates.push(AlertKind::BackInRange),
            _ => {}
        }

        if crosses(observation.fees_usd, policy.fees_threshold_usd) {
            candidates.push(AlertKind::FeesThreshold);
        }
        if crosses(observation.il_pct, policy.il_threshold_pct) {
            candidates.push(AlertKind::IlThreshold);
        }

        candidates
            .into_iter()
            .filter(|kind| {
                let key = kind.cooldown_key(record_id);
                let acquired = self.cooldowns.try_acquire(&key, kind.cooldown());
                if !acquired {
                    debug!("{} still cooling down", key);
                }
                acquired
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::cooldown::ManualClock;
    use chrono::Utc;

    fn decider() -> (Arc<ManualClock>, AlertDecider) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker = Arc::new(CooldownTracker::with_clock(clock.clone()));
        (clock, AlertDecider::new(tracker))
    }

    fn policy() -> AlertPolicy {
        AlertPolicy {
            alert_out_of_range: true,
            fees_threshold_usd: Some(50.0),
            il_threshold_pct: Some(5.0),
        }
    }

    fn observe(previous: RangeStatus, current: RangeStatus) -> CycleObservation {
        CycleObservation {
            previous,
            current,
            fees_usd: None,
            il_pct: None,
        }
    }

    #[test]
    fn test_keys_and_windows() {
        assert_eq!(AlertKind::OutOfRange.cooldown_key("abc"), "out_of_range_abc");
        assert_eq!(AlertKind::BackInRange.cooldown(), Duration::minutes(30));
        assert_eq!(AlertKind::FeesThreshold.cooldown(), Duration::minutes(180));
        assert_eq!(AlertKind::IlThreshold.cooldown(), Duration::minutes(360));
    }

    #[test]
    fn test_transition_table() {
        use RangeStatus::*;
        assert_eq!(range_transition(InRange, OutOfRange), Some(AlertKind::OutOfRange));
        assert_eq!(range_transition(OutOfRange, InRange), Some(AlertKind::BackInRange));
        assert_eq!(range_transition(InRange, InRange), None);
        assert_eq!(range_transition(OutOfRange, OutOfRange), None);
        assert_eq!(range_transition(Unknown, OutOfRange), None);
        assert_eq!(range_transition(InRange, Unknown), None);
        assert_eq!(range_transition(Unknown, InRange), None);
    }

    #[test]
    fn test_left_range_fires_once() {
        let (_, decider) = decider();
        let kinds = decider.decide(
            "pool-1",
            &policy(),
            &observe(RangeStatus::InRange, RangeStatus::OutOfRange),
        );
        assert_eq!(kinds, vec![AlertKind::OutOfRange]);
    }

    #[test]
    fn test_toggle_gates_left_range_only() {
        let (_, decider) = decider();
        let muted = AlertPolicy {
            alert_out_of_range: false,
            ..policy()
        };

        let left = decider.decide("p", &muted, &observe(RangeStatus::InRange, RangeStatus::OutOfRange));
        assert!(left.is_empty());

        let back = decider.decide("p", &muted, &observe(RangeStatus::OutOfRange, RangeStatus::InRange));
        assert_eq!(back, vec![AlertKind::BackInRange]);
    }

    #[test]
    fn test_repeated_out_of_range_cycles() {
        let (clock, decider) = decider();
        let mut previous = RangeStatus::InRange;
        let mut fired = Vec::new();

        for _ in 0..3 {
            let current = RangeStatus::OutOfRange;
            fired.extend(decider.decide("pool-1", &policy(), &observe(previous, current)));
            previous = current;
            clock.advance(Duration::minutes(5));
        }

        assert_eq!(fired, vec![AlertKind::OutOfRange]);
    }

    #[test]
    fn test_cooldown_blocks_flapping() {
        let (clock, decider) = decider();
        let p = policy();

        assert_eq!(
            decider.decide("x", &p, &observe(RangeStatus::InRange, RangeStatus::OutOfRange)),
            vec![AlertKind::OutOfRange]
        );
        clock.advance(Duration::minutes(10));
        decider.decide("x", &p, &observe(RangeStatus::OutOfRange, RangeStatus::InRange));
        clock.advance(Duration::minutes(10));

        // Left again 20 minutes after the first alert: still inside 60 minutes
        let again = decider.decide("x", &p, &observe(RangeStatus::InRange, RangeStatus::OutOfRange));
        assert!(again.is_empty());

        clock.advance(Duration::minutes(41));
        let later = decider.decide("x", &p, &observe(RangeStatus::InRange, RangeStatus::OutOfRange));
        assert_eq!(later, vec![AlertKind::OutOfRange]);
    }

    #[test]
    fn test_thresholds_fire_independently() {
        let (_, decider) = decider();
        let observation = CycleObservation {
            previous: RangeStatus::InRange,
            current: RangeStatus::OutOfRange,
            fees_usd: Some(50.0),
            il_pct: Some(7.5),
        };

        let kinds = decider.decide("y", &policy(), &observation);
        assert_eq!(
            kinds,
            vec![AlertKind::OutOfRange, AlertKind::FeesThreshold, AlertKind::IlThreshold]
        );
    }

    #[test]
    fn test_thresholds_need_both_sides() {
        let (_, decider) = decider();
        let observation = CycleObservation {
            previous: RangeStatus::Unknown,
            current: RangeStatus::Unknown,
            fees_usd: Some(49.99),
            il_pct: None,
        };
        assert!(decider.decide("z", &policy(), &observation).is_empty());

        let no_threshold = AlertPolicy::default();
        let rich = CycleObservation {
            fees_usd: Some(1e9),
            il_pct: Some(99.0),
            ..observation
        };
        assert!(decider.decide("z", &no_threshold, &rich).is_empty());
    }
}
