//! Statistics for the coordination service

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::model::Snapshot;

/// Running totals of orchestration events
#[derive(Debug)]
pub struct FleetCounters {
    started_at: Instant,
    relays_spawned: AtomicU64,
    relays_reclaimed: AtomicU64,
    spawn_failures: AtomicU64,
    entities_evicted: AtomicU64,
}

impl FleetCounters {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            relays_spawned: AtomicU64::new(0),
            relays_reclaimed: AtomicU64::new(0),
            spawn_failures: AtomicU64::new(0),
            entities_evicted: AtomicU64::new(0),
        }
    }

    pub fn record_spawn(&self) {
        self.relays_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spawn_failure(&self) {
        self.spawn_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaimed(&self, count: usize) {
        self.relays_reclaimed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.entities_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for FleetCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Fleet statistics, served on `GET /stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    pub radios: usize,
    pub static_relays: usize,
    pub transient_relays: usize,
    pub receivers: usize,
    /// Receivers routed to a relay
    pub streaming_receivers: usize,
    pub relays_spawned: u64,
    pub relays_reclaimed: u64,
    pub spawn_failures: u64,
    pub entities_evicted: u64,
    pub uptime_secs: u64,
    /// State version
    pub version: u64,
    /// Open long-poll and push connections
    pub watchers: usize,
}

impl FleetStats {
    pub fn collect(
        snapshot: &Snapshot,
        counters: &FleetCounters,
        version: u64,
        watchers: usize,
    ) -> Self {
        let transient_relays = snapshot.relays.values().filter(|r| r.transient).count();

        Self {
            radios: snapshot.radios.len(),
            static_relays: snapshot.relays.len() - transient_relays,
            transient_relays,
            receivers: snapshot.receivers.len(),
            streaming_receivers: snapshot
                .receivers
                .values()
                .filter(|r| !r.relay.is_off())
                .count(),
            relays_spawned: counters.relays_spawned.load(Ordering::Relaxed),
            relays_reclaimed: counters.relays_reclaimed.load(Ordering::Relaxed),
            spawn_failures: counters.spawn_failures.load(Ordering::Relaxed),
            entities_evicted: counters.entities_evicted.load(Ordering::Relaxed),
            uptime_secs: counters.uptime().as_secs(),
            version,
            watchers,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{Radio, ReceiverRegistration, RelayRegistration};

    #[test]
    fn test_counters_new() {
        let counters = FleetCounters::new();
        let stats = FleetStats::collect(&Snapshot::default(), &counters, 0, 0);

        assert_eq!(stats.relays_spawned, 0);
        assert_eq!(stats.relays_reclaimed, 0);
        assert_eq!(stats.spawn_failures, 0);
        assert_eq!(stats.entities_evicted, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let counters = FleetCounters::new();
        counters.record_spawn();
        counters.record_spawn();
        counters.record_spawn_failure();
        counters.record_reclaimed(2);
        counters.record_evicted(3);

        let stats = FleetStats::collect(&Snapshot::default(), &counters, 7, 1);

        assert_eq!(stats.relays_spawned, 2);
        assert_eq!(stats.spawn_failures, 1);
        assert_eq!(stats.relays_reclaimed, 2);
        assert_eq!(stats.entities_evicted, 3);
        assert_eq!(stats.version, 7);
        assert_eq!(stats.watchers, 1);
    }

    #[test]
    fn test_collect_counts_entities() {
        let now = Utc::now();
        let mut snapshot = Snapshot::bootstrap();
        let radio = snapshot.add_radio(Radio::new("Test", "test")).unwrap();
        let receiver = snapshot
            .ping_receiver(
                &ReceiverRegistration {
                    name: "kitchen".into(),
                    host: "pi".into(),
                    volume: None,
                },
                now,
            )
            .unwrap();
        snapshot
            .ping_relay(
                &RelayRegistration {
                    name: "studio".into(),
                    host: "studio".into(),
                    port: 48100,
                    radio_uri: None,
                },
                now,
            )
            .unwrap();
        snapshot
            .reserve_relay(&radio, Some(&receiver), "mesh", 48110, &Default::default(), now)
            .unwrap();
        snapshot
            .ping_receiver(
                &ReceiverRegistration {
                    name: "idle".into(),
                    host: "pi2".into(),
                    volume: None,
                },
                now,
            )
            .unwrap();

        let stats = FleetStats::collect(&snapshot, &FleetCounters::new(), 0, 0);

        assert_eq!(stats.radios, 2);
        assert_eq!(stats.static_relays, 1);
        assert_eq!(stats.transient_relays, 1);
        assert_eq!(stats.receivers, 2);
        assert_eq!(stats.streaming_receivers, 1);
    }
}
