//! Relay processes
//!
//! A [`RelaySpawner`] turns a relay record into a running media path from the
//! radio's source URI to a TCP server on the relay's `host:port`. The media
//! spawner supervises each path and restarts it after a fault, giving up
//! after a bounded number of consecutive failed restarts.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::media::{FaultReceiver, MediaEngine, MediaError, SinkDescriptor, SourceDescriptor};
use crate::model::{Relay, RelayId};

/// Default delay before restarting a faulted relay
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of consecutive failed restarts before a relay is given up
pub const DEFAULT_MAX_RESTARTS: u32 = 24;

/// What a relay process streams, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySpec {
    pub id: RelayId,
    pub radio_uri: String,
    pub host: String,
    pub port: u16,
}

impl RelaySpec {
    /// Spec for a relay record, if it has a radio to stream
    pub fn from_relay(relay: &Relay) -> Option<Self> {
        Some(Self {
            id: relay.id(),
            radio_uri: relay.radio_uri.clone()?,
            host: relay.host.clone(),
            port: relay.port,
        })
    }
}

/// Error starting a relay process
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("relay {relay} has no radio to stream")]
    NoSource { relay: RelayId },

    #[error("relay {relay} failed to start: {source}")]
    Media {
        relay: RelayId,
        #[source]
        source: MediaError,
    },

    /// The spawn another request was waiting on did not succeed
    #[error("relay {relay} did not start")]
    NotStarted { relay: RelayId },
}

/// Starts and stops relay processes
pub trait RelaySpawner: Send + Sync + 'static {
    /// Running relay process
    type Process: Send + Sync + 'static;

    fn spawn(&self, spec: &RelaySpec) -> impl Future<Output = Result<Self::Process, SpawnError>> + Send;

    fn stop(&self, process: Self::Process) -> impl Future<Output = ()> + Send;

    /// Whether the process is still streaming
    fn is_alive(&self, process: &Self::Process) -> bool;
}

/// Spawner running relays as supervised media paths
pub struct MediaRelaySpawner<E: MediaEngine> {
    engine: Arc<E>,
    retry_interval: Duration,
    max_restarts: u32,
}

impl<E: MediaEngine> MediaRelaySpawner<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }

    /// Set the delay before a restart
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the restart bound
    pub fn max_restarts(mut self, max: u32) -> Self {
        self.max_restarts = max;
        self
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }
}

/// A supervised relay media path
pub struct RelayProcess {
    relay: RelayId,
    alive: Arc<AtomicBool>,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RelayProcess {
    pub fn relay(&self) -> &RelayId {
        &self.relay
    }
}

struct Supervisor<E: MediaEngine> {
    engine: Arc<E>,
    relay: RelayId,
    source: SourceDescriptor,
    sink: SinkDescriptor,
    retry_interval: Duration,
    max_restarts: u32,
    alive: Arc<AtomicBool>,
}

impl<E: MediaEngine> Supervisor<E> {
    async fn run(self, handle: E::Handle, faults: FaultReceiver, mut stop_rx: oneshot::Receiver<()>) {
        let mut current = Some(handle);
        let mut faults = faults;

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                fault = faults.recv() => {
                    tracing::warn!(relay = %self.relay, fault = ?fault, "Relay media path ended");
                    if let Some(handle) = current.take() {
                        self.engine.stop(handle).await;
                    }

                    match self.restart(&mut stop_rx).await {
                        Some((handle, rx)) => {
                            current = Some(handle);
                            faults = rx;
                        }
                        None => break,
                    }
                }
            }
        }

        if let Some(handle) = current.take() {
            self.engine.stop(handle).await;
        }
        self.alive.store(false, Ordering::Release);
    }

    /// Retry until the path starts, the bound is hit, or the relay is stopped
    async fn restart(&self, stop_rx: &mut oneshot::Receiver<()>) -> Option<(E::Handle, FaultReceiver)> {
        for attempt in 1..=self.max_restarts {
            tokio::select! {
                _ = &mut *stop_rx => return None,
                _ = tokio::time::sleep(self.retry_interval) => {}
            }

            let (tx, rx) = mpsc::unbounded_channel();
            match self.engine.start(&self.source, &self.sink, tx).await {
                Ok(handle) => {
                    tracing::info!(relay = %self.relay, attempt, "Relay restarted");
                    return Some((handle, rx));
                }
                Err(e) => {
                    tracing::warn!(relay = %self.relay, attempt, error = %e, "Relay restart failed");
                }
            }
        }

        tracing::error!(relay = %self.relay, attempts = self.max_restarts, "Giving up on relay");
        None
    }
}

impl<E: MediaEngine> RelaySpawner for MediaRelaySpawner<E> {
    type Process = RelayProcess;

    async fn spawn(&self, spec: &RelaySpec) -> Result<RelayProcess, SpawnError> {
        let source = SourceDescriptor::Uri(spec.radio_uri.clone());
        let sink = SinkDescriptor::TcpServer {
            host: spec.host.clone(),
            port: spec.port,
        };

        let (tx, faults) = mpsc::unbounded_channel();
        let handle = self
            .engine
            .start(&source, &sink, tx)
            .await
            .map_err(|source| SpawnError::Media {
                relay: spec.id.clone(),
                source,
            })?;

        let alive = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = oneshot::channel();
        let supervisor = Supervisor {
            engine: Arc::clone(&self.engine),
            relay: spec.id.clone(),
            source,
            sink,
            retry_interval: self.retry_interval,
            max_restarts: self.max_restarts,
            alive: Arc::clone(&alive),
        };
        let task = tokio::spawn(supervisor.run(handle, faults, stop_rx));

        Ok(RelayProcess {
            relay: spec.id.clone(),
            alive,
            stop_tx,
            task,
        })
    }

    async fn stop(&self, process: RelayProcess) {
        let _ = process.stop_tx.send(());
        if let Err(e) = process.task.await {
            tracing::warn!(relay = %process.relay, error = %e, "Relay supervisor failed");
        }
    }

    fn is_alive(&self, process: &RelayProcess) -> bool {
        process.alive.load(Ordering::Acquire) && !process.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::RecordingEngine;
    use crate::media::MediaFault;

    fn spec() -> RelaySpec {
        RelaySpec {
            id: RelayId::new("mesh", 48110),
            radio_uri: "test".into(),
            host: "mesh".into(),
            port: 48110,
        }
    }

    #[tokio::test]
    async fn test_spawn_starts_relay_path() {
        let engine = Arc::new(RecordingEngine::new());
        let spawner = MediaRelaySpawner::new(Arc::clone(&engine));

        let process = spawner.spawn(&spec()).await.unwrap();

        assert!(spawner.is_alive(&process));
        assert_eq!(
            engine.started(),
            vec![(
                SourceDescriptor::Uri("test".into()),
                SinkDescriptor::TcpServer {
                    host: "mesh".into(),
                    port: 48110
                }
            )]
        );

        spawner.stop(process).await;
        assert_eq!(engine.running(), 0);
        assert_eq!(engine.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let engine = Arc::new(RecordingEngine::new());
        engine.fail_next(1);
        let spawner = MediaRelaySpawner::new(engine);

        let result = spawner.spawn(&spec()).await;

        assert!(matches!(result, Err(SpawnError::Media { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_fault() {
        let engine = Arc::new(RecordingEngine::new());
        let spawner = MediaRelaySpawner::new(Arc::clone(&engine)).retry_interval(Duration::from_secs(5));
        let process = spawner.spawn(&spec()).await.unwrap();

        engine.fault_all(MediaFault::EndOfStream);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(engine.start_count(), 2);
        assert_eq!(engine.running(), 1);
        assert!(spawner.is_alive(&process));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_bound() {
        let engine = Arc::new(RecordingEngine::new());
        let spawner = MediaRelaySpawner::new(Arc::clone(&engine))
            .retry_interval(Duration::from_secs(1))
            .max_restarts(3);
        let process = spawner.spawn(&spec()).await.unwrap();

        engine.fail_next(3);
        engine.fault_all(MediaFault::Error("source went away".into()));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!spawner.is_alive(&process));
        assert_eq!(engine.start_count(), 1);
    }

    #[test]
    fn test_spec_requires_radio() {
        let relay = Relay {
            name: "studio".into(),
            host: "studio".into(),
            port: 48100,
            transient: false,
            last_heartbeat: chrono::Utc::now(),
            radio_id: None,
            radio_uri: None,
        };
        assert!(RelaySpec::from_relay(&relay).is_none());
    }
}
