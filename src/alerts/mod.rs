//! Alerts
//!
//! Responsible for:
//! - Per-position, per-kind cooldowns with timed eviction
//! - Deciding which alerts a monitoring cycle fires
//! - Formatting and delivering them

mod cooldown;
mod detector;
mod message;
mod notifier;

pub use cooldown::{Clock, CooldownTracker, SystemClock};
pub use detector::{range_transition, AlertDecider, AlertKind, AlertPolicy, CycleObservation};
pub use message::{format_price, format_usd, AlertContext, MessageFormatter};
pub use notifier::{DeliveryOutcome, LogNotifier, Notifier, TelegramNotifier};

#[cfg(test)]
pub use cooldown::ManualClock;
#[cfg(test)]
pub use notifier::RecordingNotifier;
