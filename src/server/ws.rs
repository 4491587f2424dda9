//! Snapshot push channel
//!
//! On open the current snapshot is sent right away, then one fresh snapshot
//! per notifier wake until the connection closes. Frames from the client are
//! ignored apart from close.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;

use crate::orchestrator::RelaySpawner;
use crate::store::SharedStore;

use super::routes::AppState;

/// Upgrade `GET /ws/config`
pub async fn push_config<S: RelaySpawner>(ws: WebSocketUpgrade, State(app): State<AppState<S>>) -> Response {
    ws.on_upgrade(move |socket| push_snapshots(socket, app.store))
}

async fn push_snapshots(mut socket: WebSocket, store: SharedStore) {
    // Subscribe first so no change between the initial send and the loop is lost
    let mut watcher = store.subscribe();
    tracing::debug!(watchers = store.notifier().watcher_count(), "Push channel opened");

    if !send_snapshot(&mut socket, &store).await {
        return;
    }

    loop {
        tokio::select! {
            changed = watcher.wait() => {
                if !changed || !send_snapshot(&mut socket, &store).await {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("Push channel closed");
}

/// Send the current snapshot; `false` once the socket is unusable
async fn send_snapshot(socket: &mut WebSocket, store: &SharedStore) -> bool {
    let encoded = match store.get_encoded().await {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode state");
            return true;
        }
    };

    let text = match String::from_utf8(encoded.body.to_vec()) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Encoded state is not UTF-8");
            return true;
        }
    };

    tracing::debug!(version = encoded.version, "Pushing config");
    socket.send(Message::Text(text)).await.is_ok()
}
