//! Media engine contract
//!
//! The coordination core only needs to start a media path from a source to a
//! sink, stop it again, and hear about it dying. Faults arrive on the channel
//! passed to [`MediaEngine::start`]; one channel per path, so a fault can
//! never be attributed to the wrong path.

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;

use super::descriptor::{SinkDescriptor, SourceDescriptor};

/// Asynchronous end of a running media path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFault {
    EndOfStream,
    Error(String),
}

/// Channel a media engine reports faults on
pub type FaultSender = mpsc::UnboundedSender<MediaFault>;

/// Receiving side of a [`FaultSender`]
pub type FaultReceiver = mpsc::UnboundedReceiver<MediaFault>;

/// Error starting a media path
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("media path rejected: {0}")]
    Rejected(String),
}

/// A media pipeline backend
pub trait MediaEngine: Send + Sync + 'static {
    /// Running media path
    type Handle: Send + Sync + 'static;

    /// Build and start a path from `source` to `sink`
    fn start(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        faults: FaultSender,
    ) -> impl Future<Output = Result<Self::Handle, MediaError>> + Send;

    /// Tear a path down
    fn stop(&self, handle: Self::Handle) -> impl Future<Output = ()> + Send;
}
