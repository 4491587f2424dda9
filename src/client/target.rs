//! What a client should be streaming
//!
//! A sender streams a radio source into its own TCP server; a receiver plays
//! the relay its route points to. Both are read from a snapshot and compared
//! with the running target to decide whether a rebuild is needed.

use std::fmt;

use crate::media::{SinkDescriptor, SourceDescriptor};
use crate::model::{
    ReceiverId, ReceiverRegistration, Registration, RelayId, RelayRegistration, Snapshot,
    DEFAULT_VOLUME, OFF,
};

/// Who this client is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A relay serving its source on `host:port`
    Sender {
        name: String,
        host: String,
        port: u16,
        /// Static source; without one the relay record's radio is used
        uri: Option<String>,
    },
    /// A receiver playing a relay
    Receiver { name: String, host: String },
}

/// Desired media path endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Radio { uri: String },
    Relay { host: String, port: u16 },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Radio { uri } => f.write_str(uri),
            Target::Relay { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

impl Role {
    /// Heartbeat body for this client
    pub fn registration(&self) -> Registration {
        match self {
            Role::Sender {
                name,
                host,
                port,
                uri,
            } => Registration::Relay(RelayRegistration {
                name: name.clone(),
                host: host.clone(),
                port: *port,
                radio_uri: uri.clone(),
            }),
            Role::Receiver { name, host } => Registration::Receiver(ReceiverRegistration {
                name: name.clone(),
                host: host.clone(),
                volume: None,
            }),
        }
    }

    /// Target for this client in `snapshot`, `None` when it should be idle
    pub fn target(&self, snapshot: &Snapshot) -> Option<Target> {
        match self {
            Role::Sender { host, port, uri, .. } => uri
                .clone()
                .or_else(|| {
                    snapshot
                        .relay(&RelayId::new(host, *port))
                        .and_then(|relay| relay.radio_uri.clone())
                })
                .filter(|uri| !uri.is_empty() && uri != OFF)
                .map(|uri| Target::Radio { uri }),
            Role::Receiver { name, .. } => {
                let receiver = snapshot.receiver(&ReceiverId::from_name(name))?;
                let relay = snapshot.relay(receiver.relay.relay()?)?;
                Some(Target::Relay {
                    host: relay.host.clone(),
                    port: relay.port,
                })
            }
        }
    }

    /// Media path reaching `target`, with settings read from `snapshot`
    pub fn path(&self, target: &Target, snapshot: &Snapshot) -> (SourceDescriptor, SinkDescriptor) {
        let source = match target {
            Target::Radio { uri } => SourceDescriptor::Uri(uri.clone()),
            Target::Relay { host, port } => SourceDescriptor::Relay {
                host: host.clone(),
                port: *port,
            },
        };

        let sink = match self {
            Role::Sender { host, port, .. } => SinkDescriptor::TcpServer {
                host: host.clone(),
                port: *port,
            },
            Role::Receiver { name, .. } => SinkDescriptor::Playback {
                volume: snapshot
                    .receiver(&ReceiverId::from_name(name))
                    .map(|receiver| receiver.volume)
                    .unwrap_or(DEFAULT_VOLUME),
            },
        };

        (source, sink)
    }
}
