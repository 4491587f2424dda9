//! Source and sink descriptors handed to a media engine

use std::fmt;

use crate::model::MAX_VOLUME;

/// Where a media path reads audio from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// A radio source URI (`test`, `alsa[:device]`, `pulse[:device]`, or any URI)
    Uri(String),
    /// The encoded stream served by a relay
    Relay { host: String, port: u16 },
}

/// Where a media path writes audio to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkDescriptor {
    /// Serve the encoded stream to receivers connecting to `host:port`
    TcpServer { host: String, port: u16 },
    /// Local audio output
    Playback { volume: u16 },
}

impl SinkDescriptor {
    /// Linear gain for a `0..=1000` volume
    pub fn gain(volume: u16) -> f64 {
        f64::from(volume.min(MAX_VOLUME)) / f64::from(MAX_VOLUME)
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Uri(uri) => f.write_str(uri),
            SourceDescriptor::Relay { host, port } => write!(f, "tcp://{}:{}", host, port),
        }
    }
}

impl fmt::Display for SinkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkDescriptor::TcpServer { host, port } => write!(f, "tcp-server://{}:{}", host, port),
            SinkDescriptor::Playback { volume } => write!(f, "playback (volume {})", volume),
        }
    }
}
