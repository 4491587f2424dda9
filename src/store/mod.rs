//! Fleet state store
//!
//! The store owns the fleet [`Snapshot`](crate::model::Snapshot) and is the
//! only way to change it. HTTP handlers, the liveness sweeper and the relay
//! orchestrator all go through [`StateStore::mutate`], which serializes
//! transitions behind one lock and then persists and signals the change.
//!
//! ```text
//!   HTTP handlers ─┐
//!   sweeper ───────┼──► StateStore::mutate ──► Persistence::write
//!   orchestrator ──┘            │
//!                               └──► ChangeNotifier::signal ──► watchers
//! ```

pub mod config;
pub mod error;
pub mod state;
#[allow(clippy::module_inception)]
pub mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use state::{Reservation, SweepReport};
pub use store::{Encoded, SharedStore, StateStore};
