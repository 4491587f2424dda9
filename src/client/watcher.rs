//! Snapshot watcher
//!
//! Keeps a connection to the coordination service open, either the push
//! channel or a long-poll loop, and publishes every snapshot received into a
//! `watch` channel. A lost connection is retried with exponential backoff;
//! the last snapshot stays published in the meantime.

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::model::Snapshot;

use super::api::{ClientError, ConfigClient};
use super::backoff::Backoff;
use super::config::WatchMode;

/// Follows state changes and publishes snapshots
pub struct SnapshotWatcher {
    client: ConfigClient,
    mode: WatchMode,
    backoff: Backoff,
    tx: watch::Sender<Snapshot>,
}

impl SnapshotWatcher {
    pub fn new(client: ConfigClient, mode: WatchMode, backoff: Backoff, tx: watch::Sender<Snapshot>) -> Self {
        Self {
            client,
            mode,
            backoff,
            tx,
        }
    }

    /// Spawn the watcher task
    ///
    /// The task ends once every receiver of the snapshot channel is gone.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while !self.tx.is_closed() {
            let tx = self.tx.clone();
            let result = tokio::select! {
                result = self.follow() => result,
                _ = tx.closed() => return,
            };

            let delay = self.backoff.next_delay();
            match result {
                Ok(()) => tracing::warn!(mode = %self.mode, delay = ?delay, "Config channel closed, reconnecting"),
                Err(e) => tracing::warn!(mode = %self.mode, error = %e, delay = ?delay, "Config channel lost, reconnecting"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn follow(&mut self) -> Result<(), ClientError> {
        match self.mode {
            WatchMode::Push => self.push().await,
            WatchMode::Poll => self.poll().await,
        }
    }

    async fn push(&mut self) -> Result<(), ClientError> {
        let url = self.client.ws_url();
        let (mut stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|source| ClientError::WebSocket {
                url: url.clone(),
                source: Box::new(source),
            })?;

        tracing::info!(url = %url, "Push channel connected");
        self.backoff.reset();

        while let Some(msg) = stream.next().await {
            let msg = msg.map_err(|source| ClientError::WebSocket {
                url: url.clone(),
                source: Box::new(source),
            })?;
            match msg {
                Message::Text(text) => self.publish(serde_json::from_str(&text)?),
                Message::Binary(data) => self.publish(serde_json::from_slice(&data)?),
                Message::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }

    async fn poll(&mut self) -> Result<(), ClientError> {
        // Catch up on whatever changed while disconnected
        let snapshot = self.client.fetch_config().await?;
        tracing::info!(server = %self.client.base(), "Polling config");
        self.backoff.reset();
        self.publish(snapshot);

        loop {
            let snapshot = self.client.wait_config().await?;
            self.publish(snapshot);
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        if changed {
            tracing::debug!("Received new config");
        }
    }
}
