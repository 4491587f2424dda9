//! Client configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default coordination service address
pub const DEFAULT_CONFIG_SERVER: &str = "http://localhost:8080";

/// How a client follows state changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    /// WebSocket push channel
    #[default]
    Push,
    /// Repeated long-poll requests
    Poll,
}

impl FromStr for WatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" | "ws" => Ok(WatchMode::Push),
            "poll" | "http" => Ok(WatchMode::Poll),
            other => Err(format!("unknown watch mode '{}', expected push or poll", other)),
        }
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchMode::Push => f.write_str("push"),
            WatchMode::Poll => f.write_str("poll"),
        }
    }
}

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the coordination service
    pub config_server: String,

    /// How state changes are followed
    pub watch: WatchMode,

    /// Interval between heartbeat pings
    pub heartbeat_interval: Duration,

    /// Delay before retrying an unreachable target
    pub retry_interval: Duration,

    /// Consecutive retries before waiting for the next state change
    pub max_retries: u32,

    /// Timeout of the relay reachability probe
    pub probe_timeout: Duration,

    /// First reconnect delay of the watch channel
    pub backoff_initial: Duration,

    /// Reconnect delay cap
    pub backoff_max: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            config_server: DEFAULT_CONFIG_SERVER.to_string(),
            watch: WatchMode::Push,
            heartbeat_interval: Duration::from_secs(30),
            retry_interval: Duration::from_secs(5),
            max_retries: 24,
            probe_timeout: Duration::from_secs(5),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(3600),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given coordination service
    pub fn new(config_server: impl Into<String>) -> Self {
        Self {
            config_server: config_server.into(),
            ..Default::default()
        }
    }

    pub fn watch(mut self, mode: WatchMode) -> Self {
        self.watch = mode;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the retry delay and bound for unreachable targets
    pub fn retry(mut self, interval: Duration, max_retries: u32) -> Self {
        self.retry_interval = interval;
        self.max_retries = max_retries;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the reconnect backoff range
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff_initial = initial;
        self.backoff_max = max;
        self
    }
}
