//! State store configuration

use std::time::Duration;

/// Default heartbeat staleness after which an entity is considered dead
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Liveness and sweep settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Heartbeat staleness after which relays/receivers are evicted
    pub liveness_timeout: Duration,

    /// How often the liveness sweep runs
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            sweep_interval: DEFAULT_LIVENESS_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Set the liveness timeout
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Interval at which clients should ping to stay registered
    pub fn heartbeat_interval(&self) -> Duration {
        self.liveness_timeout / 2
    }
}
