//! Fleet data model
//!
//! Radios are upstream sources, relays re-expose one radio each on a
//! `host:port`, receivers listen to one relay. The routing edges
//! (relay→radio, receiver→relay) are stored on the entities.

pub mod entity;
pub mod id;
pub mod snapshot;

pub use entity::{
    EntityKind, Radio, Receiver, ReceiverRegistration, Registration, Relay, RelayRegistration,
    DEFAULT_VOLUME, MAX_VOLUME,
};
pub use id::{RadioId, ReceiverId, RelayId, Route, OFF};
pub use snapshot::{DanglingRoute, Routes, Snapshot};
