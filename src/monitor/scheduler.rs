//! Periodic sweeps
//!
//! One sweep immediately on start, then one per interval until stopped.
//! Ticks that fall due while a sweep is still running are skipped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::checker::PoolMonitor;

/// Stops a running scheduler when told to or when dropped
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop and wait for the current sweep to finish
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
    }
}

pub struct Scheduler {
    monitor: Arc<PoolMonitor>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(monitor: Arc<PoolMonitor>, interval: Duration) -> Self {
        Self { monitor, interval }
    }

    pub fn start(self) -> SchedulerHandle {
        let (stop, mut stopped) = watch::channel(false);

        info!(
            "⏰ Scheduler started: checking every {} minute(s)",
            self.interval.as_secs() / 60
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.monitor.sweep().await {
                            Ok(summary) => info!(
                                "Scheduled sweep: {}/{} positions ok",
                                summary.succeeded(),
                                summary.checked()
                            ),
                            Err(e) => error!("Scheduled sweep failed: {}", e),
                        }
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("⏹️  Scheduler stopped");
        });

        SchedulerHandle { stop, task }
    }
}
