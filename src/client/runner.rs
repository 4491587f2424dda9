//! Sender/receiver process wiring
//!
//! Fetches the initial snapshot, then runs the heartbeat, the snapshot
//! watcher and the reconciliation loop side by side until shutdown.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::media::MediaEngine;

use super::api::{ClientError, ConfigClient};
use super::backoff::Backoff;
use super::config::ClientConfig;
use super::heartbeat::spawn_heartbeat;
use super::reconcile::{ClientPhase, Reconciler};
use super::target::Role;
use super::watcher::SnapshotWatcher;

/// A sender or receiver following the coordination service
pub struct FleetClient<E: MediaEngine> {
    config: ClientConfig,
    role: Role,
    engine: Arc<E>,
    phases: Mutex<Option<watch::Receiver<ClientPhase>>>,
}

impl<E: MediaEngine> FleetClient<E> {
    pub fn new(config: ClientConfig, role: Role, engine: Arc<E>) -> Self {
        Self {
            config,
            role,
            engine,
            phases: Mutex::new(None),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Phase updates of the running client, once `run` has started
    pub async fn phases(&self) -> Option<watch::Receiver<ClientPhase>> {
        self.phases.lock().await.clone()
    }

    /// Run until `shutdown` completes
    ///
    /// Fails only if the initial snapshot cannot be fetched.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ClientError>
    where
        F: Future<Output = ()>,
    {
        let api = ConfigClient::new(self.config.config_server.as_str());
        let reconciler = Reconciler::new(self.role.clone(), Arc::clone(&self.engine), self.config.clone());
        *self.phases.lock().await = Some(reconciler.phases());

        let registration = self.role.registration();
        tracing::info!(id = %registration.id(), server = %api.base(), "Fetching config");
        if let Err(e) = api.ping(&registration).await {
            tracing::warn!(error = %e, "Initial heartbeat failed");
        }
        let initial = api.fetch_config().await?;

        let (tx, rx) = watch::channel(initial);
        let backoff = Backoff::new(self.config.backoff_initial, self.config.backoff_max);
        let watcher_handle = SnapshotWatcher::new(api.clone(), self.config.watch, backoff, tx).spawn();
        let heartbeat_handle = spawn_heartbeat(api, registration, self.config.heartbeat_interval);

        reconciler.run(rx, shutdown).await;

        watcher_handle.abort();
        heartbeat_handle.abort();
        Ok(())
    }
}
