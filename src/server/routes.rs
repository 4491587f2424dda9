//! HTTP handlers
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /config[?wait]` | Current snapshot, optionally after the next change |
//! | `POST /radio` | Add or replace a radio |
//! | `DELETE /radio?id=` | Remove a radio |
//! | `POST /ping/relay` | Relay heartbeat and registration |
//! | `POST /ping/receiver` | Receiver heartbeat and registration |
//! | `GET /receiver?id=&{server,radio,volume}=` | Route a receiver or set its volume |
//! | `GET /ws/config` | Snapshot push channel |
//! | `GET /health` | Service liveness |
//! | `GET /stats` | Fleet counters |

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::model::{
    EntityKind, Radio, RadioId, Receiver, ReceiverId, ReceiverRegistration, Registration,
    RelayRegistration, Route,
};
use crate::orchestrator::{RelayOrchestrator, RelaySpawner};
use crate::stats::{FleetCounters, FleetStats};
use crate::store::{SharedStore, StoreError};

use super::error::ApiError;
use super::ws;

/// Shared state of every handler
pub struct AppState<S: RelaySpawner> {
    pub store: SharedStore,
    pub orchestrator: Arc<RelayOrchestrator<S>>,
    pub counters: Arc<FleetCounters>,
}

impl<S: RelaySpawner> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            orchestrator: Arc::clone(&self.orchestrator),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Build the router over `state`
pub fn router<S: RelaySpawner>(state: AppState<S>) -> Router {
    Router::new()
        .route("/config", get(get_config::<S>))
        .route("/radio", post(add_radio::<S>).delete(remove_radio::<S>))
        .route("/ping/relay", post(ping_relay::<S>))
        .route("/ping/receiver", post(ping_receiver::<S>))
        .route("/receiver", get(update_receiver::<S>))
        .route("/ws/config", get(ws::push_config::<S>))
        .route("/health", get(health))
        .route("/stats", get(stats::<S>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ConfigQuery {
    wait: Option<String>,
}

async fn get_config<S: RelaySpawner>(
    State(app): State<AppState<S>>,
    Query(query): Query<ConfigQuery>,
) -> Result<Response, ApiError> {
    if query.wait.is_some() {
        let mut watcher = app.store.subscribe();
        watcher.wait().await;
    }

    let encoded = app
        .store
        .get_encoded()
        .await
        .map_err(|e| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tracing::debug!(version = encoded.version, "Serving config");

    Ok(([(CONTENT_TYPE, "application/json")], encoded.body).into_response())
}

#[derive(Debug, Deserialize)]
struct RadioBody {
    name: String,
    uri: String,
}

/// A radio together with its derived id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioView {
    pub id: RadioId,
    pub name: String,
    pub uri: String,
}

async fn add_radio<S: RelaySpawner>(
    State(app): State<AppState<S>>,
    Json(body): Json<RadioBody>,
) -> Result<Json<RadioView>, ApiError> {
    let radio = Radio::new(body.name, body.uri);
    let id = app.store.add_radio(radio.clone()).await?;
    tracing::info!(radio = %id, name = %radio.name, uri = %radio.uri, "Added radio");

    Ok(Json(RadioView {
        id,
        name: radio.name,
        uri: radio.uri,
    }))
}

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: Option<String>,
}

async fn remove_radio<S: RelaySpawner>(
    State(app): State<AppState<S>>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .map(RadioId::parse)
        .ok_or_else(|| StoreError::validation("missing 'id' parameter"))?;

    let removed = app.store.remove_radio(&id).await?;
    tracing::info!(radio = %id, relays = removed.len(), "Removed radio");

    Ok(Json(removed.iter().map(|relay| relay.to_string()).collect()))
}

async fn ping_relay<S: RelaySpawner>(
    State(app): State<AppState<S>>,
    Json(body): Json<RelayRegistration>,
) -> Result<Json<String>, ApiError> {
    Ok(Json(app.store.ping(Registration::Relay(body)).await?))
}

async fn ping_receiver<S: RelaySpawner>(
    State(app): State<AppState<S>>,
    Json(body): Json<ReceiverRegistration>,
) -> Result<Json<String>, ApiError> {
    Ok(Json(app.store.ping(Registration::Receiver(body)).await?))
}

#[derive(Debug, Deserialize)]
struct ReceiverQuery {
    id: Option<String>,
    server: Option<String>,
    radio: Option<String>,
    volume: Option<String>,
}

/// One receiver update; exactly one kind per request
enum ReceiverUpdate {
    Server(Route),
    Radio(RadioId),
    Volume(i64),
}

impl ReceiverQuery {
    fn parse(self) -> Result<(ReceiverId, ReceiverUpdate), StoreError> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .map(ReceiverId::parse)
            .ok_or_else(|| StoreError::validation("missing 'id' parameter"))?;

        let update = match (self.server, self.radio, self.volume) {
            (Some(server), None, None) => ReceiverUpdate::Server(Route::parse(&server)),
            (None, Some(radio), None) => ReceiverUpdate::Radio(RadioId::parse(radio)),
            (None, None, Some(volume)) => {
                let parsed = volume
                    .trim()
                    .parse()
                    .map_err(|_| StoreError::validation(format!("invalid volume '{}'", volume)))?;
                ReceiverUpdate::Volume(parsed)
            }
            _ => {
                return Err(StoreError::validation(
                    "expected exactly one of 'server', 'radio' or 'volume'",
                ))
            }
        };

        Ok((id, update))
    }
}

async fn update_receiver<S: RelaySpawner>(
    State(app): State<AppState<S>>,
    Query(query): Query<ReceiverQuery>,
) -> Result<Json<Receiver>, ApiError> {
    let (id, update) = query.parse()?;

    match update {
        ReceiverUpdate::Server(route) => {
            app.store.assign_relay(&id, route.clone()).await?;
            tracing::info!(receiver = %id, route = %route, "Routed receiver");
        }
        ReceiverUpdate::Radio(radio) => {
            let relay = app.orchestrator.route_receiver_to_radio(&id, &radio).await?;
            tracing::info!(receiver = %id, radio = %radio, relay = ?relay, "Routed receiver to radio");
        }
        ReceiverUpdate::Volume(volume) => {
            app.store.set_volume(&id, volume).await?;
            tracing::info!(receiver = %id, volume, "Set receiver volume");
        }
    }

    let receiver = app
        .store
        .get()
        .await
        .receiver(&id)
        .cloned()
        .ok_or_else(|| StoreError::not_found(EntityKind::Receiver, &id))?;
    Ok(Json(receiver))
}

async fn health() -> &'static str {
    "ok"
}

async fn stats<S: RelaySpawner>(State(app): State<AppState<S>>) -> Json<FleetStats> {
    let snapshot = app.store.get().await;
    let version = app.store.version().await;
    let watchers = app.store.notifier().watcher_count();

    Json(FleetStats::collect(&snapshot, &app.counters, version, watchers))
}
