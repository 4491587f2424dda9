//! Periodic heartbeat ping

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::model::Registration;

use super::api::ConfigClient;

/// Spawn a task pinging the coordination service every `interval`
///
/// The first ping goes out immediately. Failures are logged and the next
/// tick tries again.
pub fn spawn_heartbeat(client: ConfigClient, registration: Registration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match client.ping(&registration).await {
                Ok(id) => tracing::debug!(id = %id, "Heartbeat sent"),
                Err(e) => tracing::warn!(id = %registration.id(), error = %e, "Heartbeat failed"),
            }
        }
    })
}
