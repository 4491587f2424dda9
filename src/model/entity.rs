//! Radios, relays and receivers
//!
//! Relays and receivers are heartbeat-tracked. They register themselves
//! through a [`Registration`], which is the tagged variant both kinds share
//! for the ping path.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RadioId, ReceiverId, RelayId, Route};

/// Highest accepted receiver volume
pub const MAX_VOLUME: u16 = 1000;

/// Volume given to receivers that register without one
pub const DEFAULT_VOLUME: u16 = MAX_VOLUME;

/// Kind of entity, used in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Radio,
    Relay,
    Receiver,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Radio => f.write_str("radio"),
            EntityKind::Relay => f.write_str("relay"),
            EntityKind::Receiver => f.write_str("receiver"),
        }
    }
}

/// A named upstream audio source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Radio {
    pub name: String,
    pub uri: String,
}

impl Radio {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }

    pub fn id(&self) -> RadioId {
        RadioId::from_uri(&self.uri)
    }

    /// Whether this is the placeholder radio meaning "nothing"
    pub fn is_off(&self) -> bool {
        self.uri == super::id::OFF
    }
}

/// A process re-exposing one radio on `host:port`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Spawned by the orchestrator (as opposed to externally operated)
    pub transient: bool,
    pub last_heartbeat: DateTime<Utc>,
    /// Radio currently routed into this relay
    pub radio_id: Option<RadioId>,
    /// Source URI the relay streams
    pub radio_uri: Option<String>,
}

impl Relay {
    pub fn id(&self) -> RelayId {
        RelayId::new(&self.host, self.port)
    }

    /// Refresh the heartbeat, never moving it backwards
    pub fn ping(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat = self.last_heartbeat.max(now);
    }

    pub fn is_static(&self) -> bool {
        !self.transient
    }

    pub fn serves(&self, radio: &RadioId) -> bool {
        self.radio_id.as_ref() == Some(radio)
    }
}

/// A downstream listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    pub host: String,
    pub last_heartbeat: DateTime<Utc>,
    pub volume: u16,
    /// Relay this receiver listens to
    pub relay: Route,
}

impl Receiver {
    pub fn id(&self) -> ReceiverId {
        ReceiverId::from_name(&self.name)
    }

    /// Refresh the heartbeat, never moving it backwards
    pub fn ping(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat = self.last_heartbeat.max(now);
    }
}

/// Body of `POST /ping/relay`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRegistration {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub radio_uri: Option<String>,
}

impl RelayRegistration {
    pub fn id(&self) -> RelayId {
        RelayId::new(&self.host, self.port)
    }
}

/// Body of `POST /ping/receiver`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverRegistration {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub volume: Option<u16>,
}

impl ReceiverRegistration {
    pub fn id(&self) -> ReceiverId {
        ReceiverId::from_name(&self.name)
    }
}

/// A heartbeat from either kind of pinging entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Relay(RelayRegistration),
    Receiver(ReceiverRegistration),
}

impl Registration {
    pub fn kind(&self) -> EntityKind {
        match self {
            Registration::Relay(_) => EntityKind::Relay,
            Registration::Receiver(_) => EntityKind::Receiver,
        }
    }

    /// Id of the entity this heartbeat is for
    pub fn id(&self) -> String {
        match self {
            Registration::Relay(r) => r.id().to_string(),
            Registration::Receiver(r) => r.id().to_string(),
        }
    }
}
