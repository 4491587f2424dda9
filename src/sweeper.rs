//! Liveness sweeper
//!
//! Periodically evicts relays and receivers whose heartbeat is older than the
//! liveness timeout. The eviction and the reset of every route pointing at an
//! evicted relay happen in one store transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::stats::FleetCounters;
use crate::store::{SharedStore, SweepReport};

/// Periodic heartbeat-timeout sweep over the store
pub struct LivenessSweeper {
    store: SharedStore,
    counters: Arc<FleetCounters>,
}

impl LivenessSweeper {
    pub fn new(store: SharedStore, counters: Arc<FleetCounters>) -> Self {
        Self { store, counters }
    }

    /// Run one sweep as of `now`
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let report = self.store.sweep_at(now).await;

        for relay in &report.relays {
            tracing::info!(relay = %relay, "Removed possibly dead relay");
        }
        for receiver in &report.receivers {
            tracing::info!(receiver = %receiver, "Removed possibly dead receiver");
        }
        for receiver in &report.reset {
            tracing::info!(receiver = %receiver, "Reset receiver routed to a removed relay");
        }
        self.counters
            .record_evicted(report.relays.len() + report.receivers.len());

        report
    }

    /// Spawn the background sweep task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(self) -> JoinHandle<()> {
        let interval = self.store.config().sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep_at(Utc::now()).await;
            }
        })
    }
}
