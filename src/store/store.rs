//! State store implementation
//!
//! The single owner of the fleet state. Every read and every write goes
//! through one exclusive lock; a transition runs on a copy of the snapshot
//! and is committed only if it succeeds, so no reader ever observes a
//! half-applied change.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::model::{Radio, RadioId, ReceiverId, Registration, RelayId, Route, Snapshot};
use crate::notify::{ChangeNotifier, ChangeWatcher};
use crate::persist::Persistence;

use super::config::StoreConfig;
use super::error::StoreError;
use super::state::SweepReport;

/// Snapshot serialized once per state version and shared by all readers
#[derive(Debug, Clone)]
pub struct Encoded {
    pub version: u64,
    pub body: Bytes,
}

struct Inner {
    snapshot: Snapshot,
    version: u64,
    encoded: Option<Bytes>,
}

impl Inner {
    fn encode(&mut self) -> Result<Encoded, serde_json::Error> {
        let body = match &self.encoded {
            Some(body) => body.clone(),
            None => {
                let body = Bytes::from(serde_json::to_vec(&self.snapshot)?);
                self.encoded = Some(body.clone());
                body
            }
        };

        Ok(Encoded {
            version: self.version,
            body,
        })
    }
}

/// Authoritative fleet state
pub struct StateStore {
    inner: Mutex<Inner>,
    notifier: ChangeNotifier,
    persistence: Option<Persistence>,
    config: StoreConfig,
}

impl StateStore {
    /// Create an in-memory store holding the bootstrap state
    pub fn new(config: StoreConfig) -> Self {
        Self::with_snapshot(config, Snapshot::bootstrap(), None)
    }

    /// Open a store backed by a snapshot file
    ///
    /// A missing or corrupt file starts from the bootstrap state. A loaded
    /// snapshot is reconciled: transient relays from the previous run are
    /// dropped and receivers routed to them reset. A reconciled snapshot is
    /// written back right away.
    pub async fn open(config: StoreConfig, persistence: Persistence) -> Self {
        let mut reconciled = false;
        let snapshot = match persistence.load().await {
            Some(mut snapshot) => {
                let report = snapshot.reconcile_after_restart();
                if !report.is_empty() {
                    tracing::info!(
                        dropped_relays = report.relays.len(),
                        reset_receivers = report.reset.len(),
                        "Reconciled config cache"
                    );
                    reconciled = true;
                }
                snapshot
            }
            None => Snapshot::bootstrap(),
        };

        let store = Self::with_snapshot(config, snapshot, Some(persistence));
        if reconciled {
            store.flush().await;
        }
        store
    }

    fn with_snapshot(
        config: StoreConfig,
        snapshot: Snapshot,
        persistence: Option<Persistence>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot,
                version: 0,
                encoded: None,
            }),
            notifier: ChangeNotifier::new(),
            persistence,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current state
    pub async fn get(&self) -> Snapshot {
        self.inner.lock().await.snapshot.clone()
    }

    /// Current state, serialized
    pub async fn get_encoded(&self) -> Result<Encoded, serde_json::Error> {
        self.inner.lock().await.encode()
    }

    /// Current state version, bumped by every committed change
    pub async fn version(&self) -> u64 {
        self.inner.lock().await.version
    }

    /// Watch for committed changes
    pub fn subscribe(&self) -> ChangeWatcher {
        self.notifier.subscribe()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Apply a transition at the current time
    pub async fn mutate<T, F>(&self, transition: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<T, StoreError>,
    {
        self.mutate_at(Utc::now(), transition).await
    }

    /// Apply a transition as of `now`
    ///
    /// On success, and only if the state actually changed, the new state is
    /// persisted and the notifier signalled exactly once.
    pub async fn mutate_at<T, F>(&self, now: DateTime<Utc>, transition: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<T, StoreError>,
    {
        let mut inner = self.inner.lock().await;
        let mut next = inner.snapshot.clone();
        let output = transition(&mut next, now)?;

        if next == inner.snapshot {
            return Ok(output);
        }

        inner.snapshot = next;
        inner.version += 1;
        inner.encoded = None;
        let encoded = inner.encode();
        drop(inner);

        match encoded {
            Ok(encoded) => self.persist(&encoded).await,
            Err(e) => tracing::error!(error = %e, "Failed to encode state"),
        }
        self.notifier.signal();

        Ok(output)
    }

    async fn persist(&self, encoded: &Encoded) {
        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.write(encoded.version, &encoded.body).await {
                tracing::error!(error = %e, version = encoded.version, "Failed to persist state");
            }
        }
    }

    /// Write the current state regardless of whether it changed
    pub async fn flush(&self) {
        match self.get_encoded().await {
            Ok(encoded) => self.persist(&encoded).await,
            Err(e) => tracing::error!(error = %e, "Failed to encode state"),
        }
    }

    /// Register or refresh a relay or receiver
    pub async fn ping(&self, registration: Registration) -> Result<String, StoreError> {
        self.mutate(|state, now| state.ping(&registration, now)).await
    }

    pub async fn add_radio(&self, radio: Radio) -> Result<RadioId, StoreError> {
        self.mutate(|state, _| state.add_radio(radio)).await
    }

    /// Remove a radio, returning the transient relays removed with it
    pub async fn remove_radio(&self, id: &RadioId) -> Result<Vec<RelayId>, StoreError> {
        self.mutate(|state, _| state.remove_radio(id)).await
    }

    pub async fn assign_relay(&self, receiver: &ReceiverId, route: Route) -> Result<(), StoreError> {
        self.mutate(|state, _| state.assign_relay(receiver, route)).await
    }

    pub async fn set_volume(&self, receiver: &ReceiverId, volume: i64) -> Result<(), StoreError> {
        self.mutate(|state, _| state.set_volume(receiver, volume)).await
    }

    /// Remove relays, resetting the receivers routed to them
    pub async fn remove_relays(&self, ids: &[RelayId]) -> Vec<ReceiverId> {
        self.mutate(|state, _| Ok(state.remove_relays(ids)))
            .await
            .unwrap_or_default()
    }

    /// Evict entities with stale heartbeats as of `now`
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let timeout = self.config.liveness_timeout;
        self.mutate_at(now, |state, now| Ok(state.sweep(now, timeout)))
            .await
            .unwrap_or_default()
    }
}

/// Shared handle to the store
pub type SharedStore = Arc<StateStore>;
