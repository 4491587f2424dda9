//! Relay orchestrator
//!
//! Owns the relay processes. A relay is reserved in the store, and the
//! receiver routed to it, in one transition; the process is started outside
//! the store lock. While a spawn is pending the relay is exempt from
//! reclamation and later callers for the same radio wait for its outcome.
//! A relay's port stays taken until its process is stopped. A failed spawn
//! removes the record again, which resets every receiver routed to it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::model::{RadioId, ReceiverId, Relay, RelayId};
use crate::stats::FleetCounters;
use crate::store::{Reservation, SharedStore};

use super::config::OrchestratorConfig;
use super::spawner::{RelaySpawner, RelaySpec, SpawnError};

/// Outcome of a pending spawn: `None` while starting, then whether it started
type SpawnOutcome = watch::Receiver<Option<bool>>;

type PendingSpawns = Mutex<HashMap<RelayId, SpawnOutcome>>;

/// What a caller does after its reservation
enum Claim {
    Off,
    Ready(RelayId),
    Wait(RelayId, SpawnOutcome),
    Spawn(Relay, watch::Sender<Option<bool>>),
}

/// A spawn in flight; leaves the pending set when finished or dropped
struct PendingSpawn<'a> {
    pending: &'a PendingSpawns,
    relay: RelayId,
    outcome: watch::Sender<Option<bool>>,
}

impl PendingSpawn<'_> {
    fn finish(self, started: bool) {
        self.outcome.send_replace(Some(started));
    }
}

impl Drop for PendingSpawn<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.relay);
    }
}

/// Finds, spawns and reclaims transient relays
pub struct RelayOrchestrator<S: RelaySpawner> {
    store: SharedStore,
    spawner: S,
    config: OrchestratorConfig,
    counters: Arc<FleetCounters>,
    processes: tokio::sync::Mutex<HashMap<RelayId, S::Process>>,
    pending: PendingSpawns,
}

impl<S: RelaySpawner> RelayOrchestrator<S> {
    pub fn new(
        store: SharedStore,
        spawner: S,
        config: OrchestratorConfig,
        counters: Arc<FleetCounters>,
    ) -> Self {
        Self {
            store,
            spawner,
            config,
            counters,
            processes: tokio::sync::Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Relay streaming `radio`, spawning one if none exists
    ///
    /// Returns `None` for the `off` radio.
    pub async fn find_or_spawn_relay(&self, radio: &RadioId) -> Result<Option<RelayId>> {
        self.acquire(radio, None).await
    }

    /// Route `receiver` to a relay streaming `radio`
    ///
    /// Routing to the `off` radio turns the receiver off. Returns the relay
    /// the receiver now listens to.
    pub async fn route_receiver_to_radio(
        &self,
        receiver: &ReceiverId,
        radio: &RadioId,
    ) -> Result<Option<RelayId>> {
        self.acquire(radio, Some(receiver)).await
    }

    async fn acquire(&self, radio: &RadioId, receiver: Option<&ReceiverId>) -> Result<Option<RelayId>> {
        let host = self.config.relay_host.as_str();
        let base_port = self.config.base_port;

        let claim = {
            // No process is registered or stopped while ports are picked
            let processes = self.processes.lock().await;
            self.store
                .mutate(|state, now| {
                    let mut pending = self.pending.lock();
                    let held: HashSet<RelayId> =
                        processes.keys().chain(pending.keys()).cloned().collect();

                    let reservation =
                        state.reserve_relay(radio, receiver, host, base_port, &held, now)?;
                    let claim = match reservation {
                        Reservation::Off => Claim::Off,
                        Reservation::Existing(id) => match pending.get(&id) {
                            Some(outcome) => Claim::Wait(id, outcome.clone()),
                            None => Claim::Ready(id),
                        },
                        Reservation::Reserved(relay) => {
                            let (tx, rx) = watch::channel(None);
                            pending.insert(relay.id(), rx);
                            Claim::Spawn(relay, tx)
                        }
                    };
                    Ok(claim)
                })
                .await?
        };

        match claim {
            Claim::Off => Ok(None),
            Claim::Ready(id) => {
                tracing::debug!(radio = %radio, relay = %id, "Reusing relay");
                Ok(Some(id))
            }
            Claim::Wait(id, mut outcome) => {
                tracing::debug!(radio = %radio, relay = %id, "Waiting for relay to start");
                let started = match outcome.wait_for(|state| state.is_some()).await {
                    Ok(state) => *state == Some(true),
                    Err(_) => false,
                };
                if started {
                    Ok(Some(id))
                } else {
                    Err(SpawnError::NotStarted { relay: id }.into())
                }
            }
            Claim::Spawn(relay, outcome) => {
                let id = relay.id();
                let spawn = PendingSpawn {
                    pending: &self.pending,
                    relay: id.clone(),
                    outcome,
                };
                let started = self.start(&relay).await;
                spawn.finish(started.is_ok());
                started.map(|_| Some(id))
            }
        }
    }

    async fn start(&self, relay: &Relay) -> Result<()> {
        let id = relay.id();
        let spec = RelaySpec::from_relay(relay).ok_or_else(|| SpawnError::NoSource { relay: id.clone() });

        tracing::info!(relay = %id, radio = ?relay.radio_id, "Spawning relay");

        let spawned = match spec {
            Ok(spec) => self.spawner.spawn(&spec).await,
            Err(e) => Err(e),
        };

        match spawned {
            Ok(process) => {
                let displaced = self.processes.lock().await.insert(id.clone(), process);
                self.counters.record_spawn();
                if let Some(displaced) = displaced {
                    tracing::warn!(relay = %id, "Stopping displaced relay process");
                    self.spawner.stop(displaced).await;
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(relay = %id, error = %e, "Failed to spawn relay");
                self.counters.record_spawn_failure();
                let reset = self.store.remove_relays(&[id]).await;
                for receiver in reset {
                    tracing::info!(receiver = %receiver, "Reset receiver after failed relay spawn");
                }
                Err(e.into())
            }
        }
    }

    /// One maintenance pass
    ///
    /// Refreshes the heartbeat of relays whose process is alive, removes
    /// transient relays without listeners, and stops every process whose
    /// relay record is gone. Returns the relays reclaimed from the store.
    pub async fn maintain(&self) -> Vec<RelayId> {
        let alive: HashSet<RelayId> = {
            let processes = self.processes.lock().await;
            processes
                .iter()
                .filter(|(_, process)| self.spawner.is_alive(process))
                .map(|(id, _)| id.clone())
                .collect()
        };

        let reclaimed = self
            .store
            .mutate(|state, now| {
                let pending: HashSet<RelayId> = self.pending.lock().keys().cloned().collect();
                Ok(state.maintain_transient(&alive, &pending, now))
            })
            .await
            .unwrap_or_default();

        // Records are created before their process is registered, so a
        // snapshot taken under the process lock covers every process
        let orphans: Vec<(RelayId, S::Process)> = {
            let mut processes = self.processes.lock().await;
            let snapshot = self.store.get().await;
            let gone: Vec<RelayId> = processes
                .keys()
                .filter(|id| snapshot.relay(id).is_none())
                .cloned()
                .collect();
            gone.into_iter()
                .filter_map(|id| processes.remove(&id).map(|process| (id, process)))
                .collect()
        };

        for (id, process) in orphans {
            tracing::info!(relay = %id, reclaimed = reclaimed.contains(&id), "Stopping relay");
            self.spawner.stop(process).await;
        }

        self.counters.record_reclaimed(reclaimed.len());
        reclaimed
    }

    /// Number of running relay processes
    pub async fn process_count(&self) -> usize {
        self.processes.lock().await.len()
    }

    /// Stop every relay process
    pub async fn shutdown(&self) {
        let processes: Vec<(RelayId, S::Process)> = self.processes.lock().await.drain().collect();

        for (id, process) in processes {
            tracing::info!(relay = %id, "Stopping relay");
            self.spawner.stop(process).await;
        }
    }

    /// Spawn the background maintenance task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_maintenance_task(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let interval = self.config.reclaim_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reclaimed = orchestrator.maintain().await;
                if !reclaimed.is_empty() {
                    tracing::debug!(count = reclaimed.len(), "Reclaimed idle relays");
                }
            }
        })
    }
}
