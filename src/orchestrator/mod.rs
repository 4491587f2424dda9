//! Relay orchestration
//!
//! ```text
//!                       ┌────────────────────┐
//!  route receiver ────▶│  RelayOrchestrator  │── reserve + route ──▶ StateStore
//!  to radio            │                     │
//!                       │  processes          │── spawn / stop ─────▶ RelaySpawner
//!  maintenance tick ──▶│  pending            │                         │
//!                       └────────────────────┘                    media path per relay
//! ```

pub mod config;
pub mod relays;
pub mod spawner;

pub use config::OrchestratorConfig;
pub use relays::RelayOrchestrator;
pub use spawner::{MediaRelaySpawner, RelayProcess, RelaySpawner, RelaySpec, SpawnError};
