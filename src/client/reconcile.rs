//! Client reconciliation loop
//!
//! ```text
//!   Fetching ──▶ ConnectedIdle ◀──────────────┐
//!                   │  target present          │ target gone / retries exhausted
//!                   ▼                          │
//!          reachable? ── no ──▶ RetryWait ─────┤
//!                   │ yes          ▲ timer     │
//!                   ▼              │           │
//!               Streaming ── fault ┘ ──────────┘
//! ```
//!
//! The loop owns the single current media path. Snapshots, media faults and
//! the retry timer are handled one at a time, so a build or teardown always
//! completes before the next one starts. A path is rebuilt only when the
//! target computed from the latest snapshot differs from the running one.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::media::{FaultReceiver, MediaEngine, MediaFault};
use crate::model::Snapshot;

use super::config::ClientConfig;
use super::probe::probe;
use super::target::{Role, Target};

/// Reconciliation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Waiting for the initial snapshot
    Fetching,
    /// Connected, no media path running
    ConnectedIdle,
    /// Media path running
    Streaming,
    /// Target unreachable, retry scheduled
    RetryWait,
}

struct ActivePath<H> {
    target: Target,
    handle: H,
    faults: FaultReceiver,
}

/// Drives one client's media path towards the target in the latest snapshot
pub struct Reconciler<E: MediaEngine> {
    role: Role,
    engine: Arc<E>,
    config: ClientConfig,
    current: Option<ActivePath<E::Handle>>,
    /// Target of the last build attempt
    wanted: Option<Target>,
    retries: u32,
    retry_at: Option<Instant>,
    phase: watch::Sender<ClientPhase>,
}

impl<E: MediaEngine> Reconciler<E> {
    pub fn new(role: Role, engine: Arc<E>, config: ClientConfig) -> Self {
        let (phase, _) = watch::channel(ClientPhase::Fetching);
        Self {
            role,
            engine,
            config,
            current: None,
            wanted: None,
            retries: 0,
            retry_at: None,
            phase,
        }
    }

    /// Follow phase changes
    pub fn phases(&self) -> watch::Receiver<ClientPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> ClientPhase {
        *self.phase.borrow()
    }

    fn set_phase(&self, phase: ClientPhase) {
        self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                tracing::debug!(from = ?*current, to = ?phase, "Client phase");
                *current = phase;
                true
            }
        });
    }

    /// Run until `shutdown` completes or the snapshot channel closes
    ///
    /// The running media path is torn down on exit.
    pub async fn run<F>(mut self, mut snapshots: watch::Receiver<Snapshot>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.set_phase(ClientPhase::ConnectedIdle);
        let snapshot = snapshots.borrow_and_update().clone();
        self.reconcile(&snapshot).await;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.reconcile(&snapshot).await;
                }
                fault = next_fault(&mut self.current) => {
                    self.on_fault(fault).await;
                }
                _ = sleep_until(self.retry_at) => {
                    self.retry_at = None;
                    let snapshot = snapshots.borrow().clone();
                    self.retry(&snapshot).await;
                }
            }
        }

        self.teardown().await;
        tracing::info!("Client stopped");
    }

    /// Bring the media path in line with `snapshot`
    async fn reconcile(&mut self, snapshot: &Snapshot) {
        let target = self.role.target(snapshot);

        if let Some(active) = &self.current {
            if Some(&active.target) == target.as_ref() {
                return;
            }
            tracing::info!(from = %active.target, to = ?target.as_ref().map(ToString::to_string), "Target changed");
            self.teardown().await;
        }

        if target != self.wanted {
            self.wanted = target.clone();
            self.retries = 0;
            self.retry_at = None;
        } else if self.retry_at.is_some() {
            // Same target, the retry timer decides when to try again
            return;
        }

        match target {
            Some(target) => self.build(target, snapshot).await,
            None => self.set_phase(ClientPhase::ConnectedIdle),
        }
    }

    async fn retry(&mut self, snapshot: &Snapshot) {
        match self.role.target(snapshot) {
            Some(target) if self.current.is_none() => {
                tracing::info!(target = %target, attempt = self.retries, "Retrying target");
                self.wanted = Some(target.clone());
                self.build(target, snapshot).await;
            }
            _ => self.reconcile(snapshot).await,
        }
    }

    async fn on_fault(&mut self, fault: Option<MediaFault>) {
        let target = self.current.as_ref().map(|active| active.target.to_string());
        match fault {
            Some(MediaFault::EndOfStream) => tracing::warn!(target = ?target, "Media path reached end of stream"),
            Some(MediaFault::Error(e)) => tracing::warn!(target = ?target, error = %e, "Media path failed"),
            None => tracing::warn!(target = ?target, "Media path vanished"),
        }

        self.teardown().await;
        self.schedule_retry();
    }

    async fn build(&mut self, target: Target, snapshot: &Snapshot) {
        if !self.reachable(&target).await {
            tracing::warn!(target = %target, "Target unreachable");
            self.schedule_retry();
            return;
        }

        let (source, sink) = self.role.path(&target, snapshot);
        let (tx, faults) = mpsc::unbounded_channel();
        match self.engine.start(&source, &sink, tx).await {
            Ok(handle) => {
                tracing::info!(target = %target, %source, %sink, "Streaming");
                self.current = Some(ActivePath {
                    target,
                    handle,
                    faults,
                });
                self.retries = 0;
                self.set_phase(ClientPhase::Streaming);
            }
            Err(e) => {
                tracing::warn!(target = %target, error = %e, "Failed to start media path");
                self.schedule_retry();
            }
        }
    }

    async fn reachable(&self, target: &Target) -> bool {
        match target {
            // A sender creates its source itself
            Target::Radio { .. } => true,
            Target::Relay { host, port } => probe(host, *port, self.config.probe_timeout).await,
        }
    }

    fn schedule_retry(&mut self) {
        if self.retries >= self.config.max_retries {
            tracing::warn!(retries = self.retries, "Giving up until the next state change");
            self.retry_at = None;
            self.set_phase(ClientPhase::ConnectedIdle);
            return;
        }

        self.retries += 1;
        self.retry_at = Some(Instant::now() + self.config.retry_interval);
        self.set_phase(ClientPhase::RetryWait);
    }

    async fn teardown(&mut self) {
        if let Some(active) = self.current.take() {
            tracing::info!(target = %active.target, "Stopping media path");
            self.engine.stop(active.handle).await;
            self.set_phase(ClientPhase::ConnectedIdle);
        }
    }
}

async fn next_fault<H>(current: &mut Option<ActivePath<H>>) -> Option<MediaFault> {
    match current {
        Some(active) => active.faults.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
