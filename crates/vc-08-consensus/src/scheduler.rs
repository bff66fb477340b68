//! # Tick Scheduler
//!
//! Drives `AgreementEngine::tick` at a fixed interval until shutdown is
//! signalled. Ticks never overlap: a slow tick delays the next one, and
//! missed ticks are skipped rather than replayed in a burst.

use crate::ports::ConsensusApi;
use crate::service::AgreementEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Fixed-cadence driver for one engine.
pub struct Scheduler {
    engine: Arc<AgreementEngine>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(engine: Arc<AgreementEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Tick until `shutdown` turns `true` or its sender is dropped. Returns
    /// the number of ticks run.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0u64;

        info!(interval_ms = self.interval.as_millis() as u64, "Agreement scheduler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.engine.tick().await;
                    ticks += 1;
                    debug!(tick = ticks, height = report.height, "Scheduler tick");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(ticks, height = self.engine.current_height(), "Agreement scheduler stopped");
        ticks
    }

    /// Run on the current tokio runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<u64> {
        tokio::spawn(self.run(shutdown))
    }
}
