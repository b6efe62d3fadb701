//! Monitoring
//!
//! Responsible for:
//! - Storing monitored positions and their alert/metric history
//! - Checking one position or sweeping all of them
//! - Running sweeps on a fixed interval

mod checker;
mod scheduler;
mod store;

pub use checker::{CheckOutcome, PoolMonitor, SweepSummary};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use store::{
    AlertHistoryEntry, InMemoryStore, MetricEntry, MonitoredPoolRecord, PositionStore,
    SnapshotUpdate,
};
