//! Sender and receiver side
//!
//! Provides the client half of the coordination protocol:
//! - HTTP calls and the periodic heartbeat
//! - Snapshot watching over push or long-poll, with reconnect backoff
//! - The reconciliation loop driving the local media path

pub mod api;
pub mod backoff;
pub mod config;
pub mod heartbeat;
pub mod probe;
pub mod reconcile;
pub mod runner;
pub mod target;
pub mod watcher;

pub use api::{ClientError, ConfigClient};
pub use backoff::Backoff;
pub use config::{ClientConfig, WatchMode};
pub use reconcile::{ClientPhase, Reconciler};
pub use runner::FleetClient;
pub use target::{Role, Target};
pub use watcher::SnapshotWatcher;
