//! Config coordination and relay orchestration for an audio fleet
//!
//! A single coordination service holds the shared topology: which radio
//! source feeds which relay, and which relay each receiver plays. Senders and
//! receivers register with periodic pings, follow the state over a WebSocket
//! push channel or HTTP long-poll, and rebuild their media path only when
//! their own target changes.
//!
//! # Service
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rtp_mesh::media::LaunchEngine;
//! use rtp_mesh::orchestrator::{MediaRelaySpawner, OrchestratorConfig, RelayOrchestrator};
//! use rtp_mesh::server::{ConfigServer, ServerConfig};
//! use rtp_mesh::stats::FleetCounters;
//! use rtp_mesh::store::{StateStore, StoreConfig};
//!
//! # async fn example() -> rtp_mesh::error::Result<()> {
//! let store = Arc::new(StateStore::new(StoreConfig::default()));
//! let counters = Arc::new(FleetCounters::new());
//! let spawner = MediaRelaySpawner::new(Arc::new(LaunchEngine::default()));
//! let orchestrator = Arc::new(RelayOrchestrator::new(
//!     Arc::clone(&store),
//!     spawner,
//!     OrchestratorConfig::new("mesh.local"),
//!     Arc::clone(&counters),
//! ));
//!
//! let server = ConfigServer::new(ServerConfig::default(), store, orchestrator, counters);
//! server.run().await
//! # }
//! ```

pub mod client;
pub mod error;
pub mod logging;
pub mod media;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod persist;
pub mod server;
pub mod stats;
pub mod store;
pub mod sweeper;

pub use error::{Error, Result};
pub use model::{Radio, RadioId, Receiver, ReceiverId, Relay, RelayId, Route, Snapshot};
pub use notify::{ChangeNotifier, ChangeWatcher};
pub use store::{SharedStore, StateStore};
