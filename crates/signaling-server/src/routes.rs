//! HTTP surface of the relay

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::SignalingServerConfig;
use crate::registry::{PeerRegistry, RelayLimits};
use crate::ws;

/// Shared handler state
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<SignalingServerConfig>,
    pub registry: Arc<PeerRegistry>,
}

impl RelayState {
    pub fn new(config: SignalingServerConfig) -> Self {
        let registry = Arc::new(PeerRegistry::new(RelayLimits::from(&config)));
        Self {
            config: Arc::new(config),
            registry,
        }
    }
}

/// Build the router: health check, relay endpoints under the mount path,
/// static frontend as the fallback.
pub fn create_router(state: RelayState) -> Router {
    let mount = state.config.mount_path().to_string();

    let mut router = Router::new()
        .route("/", get(health))
        .route(&format!("{}/:key/id", mount), get(generate_id))
        .route(&format!("{}/:key/peers", mount), get(list_peers))
        .route(&format!("{}/peerjs", mount), get(ws::relay_socket));
    if !mount.is_empty() {
        router = router
            .route(&mount, get(relay_info))
            .route(&format!("{}/", mount), get(relay_info));
    }
    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "message": "ShopCall Signaling Server is Running",
    }))
}

async fn relay_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "ShopCall Signaling Relay",
        "description": "Brokers connections between PeerJS clients",
        "version": crate::VERSION,
    }))
}

fn invalid_key() -> Response {
    (StatusCode::UNAUTHORIZED, "Invalid key provided").into_response()
}

async fn generate_id(State(state): State<RelayState>, Path(key): Path<String>) -> Response {
    if key != state.config.key {
        return invalid_key();
    }
    let id = loop {
        let candidate = Uuid::new_v4().to_string();
        if !state.registry.is_connected(&candidate) {
            break candidate;
        }
    };
    id.into_response()
}

async fn list_peers(State(state): State<RelayState>, Path(key): Path<String>) -> Response {
    if key != state.config.key || !state.config.allow_discovery {
        return invalid_key();
    }
    Json(state.registry.peer_ids()).into_response()
}
