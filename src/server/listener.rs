//! Coordination server listener
//!
//! Serves the HTTP/WS router and runs the background tasks that mutate the
//! store besides requests: the liveness sweeper and relay maintenance.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::orchestrator::{RelayOrchestrator, RelaySpawner};
use crate::server::config::ServerConfig;
use crate::server::routes::{self, AppState};
use crate::stats::FleetCounters;
use crate::store::SharedStore;
use crate::sweeper::LivenessSweeper;

/// Coordination server
pub struct ConfigServer<S: RelaySpawner> {
    config: ServerConfig,
    store: SharedStore,
    orchestrator: Arc<RelayOrchestrator<S>>,
    counters: Arc<FleetCounters>,
}

impl<S: RelaySpawner> ConfigServer<S> {
    pub fn new(
        config: ServerConfig,
        store: SharedStore,
        orchestrator: Arc<RelayOrchestrator<S>>,
        counters: Arc<FleetCounters>,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
            counters,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<RelayOrchestrator<S>> {
        &self.orchestrator
    }

    /// Router over this server's state
    pub fn router(&self) -> Router {
        routes::router(AppState {
            store: Arc::clone(&self.store),
            orchestrator: Arc::clone(&self.orchestrator),
            counters: Arc::clone(&self.counters),
        })
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Config server listening");

        let sweeper_handle =
            LivenessSweeper::new(Arc::clone(&self.store), Arc::clone(&self.counters)).spawn();
        let maintenance_handle = self.orchestrator.spawn_maintenance_task();

        // Long-poll and push connections never finish on their own, so the
        // accept loop is dropped instead of drained
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = axum::serve(listener, self.router()).into_future() => result,
        };

        // Stop background tasks on shutdown
        sweeper_handle.abort();
        maintenance_handle.abort();

        if self.config.stop_relays_on_shutdown {
            self.orchestrator.shutdown().await;
        }
        self.store.flush().await;

        Ok(result?)
    }
}
