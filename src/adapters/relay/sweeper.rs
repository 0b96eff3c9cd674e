//! WhitelistSweeper - Background eviction of dead whitelist entries.
//!
//! Runs on a wall-clock interval, independent of request volume, and stops
//! when the shutdown channel flips to `true`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::ports::RelayWhitelist;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct WhitelistSweeper {
    whitelist: Arc<dyn RelayWhitelist>,
    interval: Duration,
}

impl WhitelistSweeper {
    pub fn new(whitelist: Arc<dyn RelayWhitelist>) -> Self {
        Self {
            whitelist,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sweep until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet.
        interval.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("whitelist sweeper stopped");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Run exactly one sweep.
    pub async fn sweep_once(&self) -> usize {
        let removed = self.whitelist.purge_expired().await;
        if removed > 0 {
            tracing::debug!(removed, "swept expired relay sessions");
        }
        removed
    }

    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
