//! Orchestrator configuration

use std::time::Duration;

/// Default first port handed to transient relays
pub const DEFAULT_BASE_PORT: u16 = 48110;

/// Default interval between maintenance passes
pub const DEFAULT_RECLAIM_INTERVAL: Duration = Duration::from_secs(30);

/// Relay orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Host transient relays run on and advertise
    pub relay_host: String,

    /// Lowest port a transient relay may take
    pub base_port: u16,

    /// How often idle relays are reclaimed and live ones refreshed
    pub reclaim_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            relay_host: "localhost".to_string(),
            base_port: DEFAULT_BASE_PORT,
            reclaim_interval: DEFAULT_RECLAIM_INTERVAL,
        }
    }
}

impl OrchestratorConfig {
    pub fn new(relay_host: impl Into<String>) -> Self {
        Self {
            relay_host: relay_host.into(),
            ..Default::default()
        }
    }

    pub fn base_port(mut self, port: u16) -> Self {
        self.base_port = port;
        self
    }

    pub fn reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval = interval;
        self
    }
}
