//! Entity identifiers
//!
//! Ids are pure functions of the identifying fields of an entity. They are
//! used as map keys in the state snapshot and as the wire identifier a client
//! compares to detect that its assignment changed.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Literal used on the wire for "no assignment"
pub const OFF: &str = "off";

/// Identifier of a radio, derived from its source URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadioId(String);

impl RadioId {
    /// Derive the id of the radio streaming `uri`
    pub fn from_uri(uri: &str) -> Self {
        let digest = Sha256::digest(uri.as_bytes());
        Self(format!("radio-{}", hex::encode(digest)))
    }

    /// Wrap an id received from a client
    pub fn parse(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RadioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a relay (`host:port`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(String);

impl RelayId {
    pub fn new(host: &str, port: u16) -> Self {
        Self(format!("{}:{}", host, port))
    }

    /// Wrap an id received from a client
    pub fn parse(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a receiver, derived from its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiverId(String);

impl ReceiverId {
    pub fn from_name(name: &str) -> Self {
        Self(format!("receiver-{}", name))
    }

    /// Wrap an id received from a client
    pub fn parse(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receiver route: either a relay or the `off` sentinel
///
/// Serialized as the plain relay id string, or `"off"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Route {
    #[default]
    Off,
    Relay(RelayId),
}

impl Route {
    /// Parse a route from a query parameter or wire value
    pub fn parse(raw: &str) -> Self {
        if raw == OFF || raw.is_empty() {
            Route::Off
        } else {
            Route::Relay(RelayId::parse(raw))
        }
    }

    pub fn relay(&self) -> Option<&RelayId> {
        match self {
            Route::Off => None,
            Route::Relay(id) => Some(id),
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, Route::Off)
    }

    /// Whether this route points at `relay`
    pub fn targets(&self, relay: &RelayId) -> bool {
        self.relay() == Some(relay)
    }
}

impl From<String> for Route {
    fn from(raw: String) -> Self {
        Route::parse(&raw)
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        match route {
            Route::Off => OFF.to_string(),
            Route::Relay(id) => id.0,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Off => f.write_str(OFF),
            Route::Relay(id) => id.fmt(f),
        }
    }
}
