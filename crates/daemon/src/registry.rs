/// Relay directory service
///
/// Thin HTTP front for a [`Directory`]: relays announce themselves once at
/// startup and senders download the full listing before every message.

use crate::api::{AppError, MessageResponse, NodeRegistryResponse, RegisterNodeRequest};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use onionmsg_core::{Directory, RelayPublicKey};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

/// Shared registry state
#[derive(Clone)]
pub struct RegistryState {
    pub directory: Arc<dyn Directory>,
}

/// Build the registry router
pub fn router(directory: Arc<dyn Directory>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/registerNode", post(register_node))
        .route("/getNodeRegistry", get(get_node_registry))
        .layer(CorsLayer::permissive())
        .with_state(RegistryState { directory })
}

/// Handler for GET /status
pub async fn status() -> &'static str {
    "live"
}

/// Handler for POST /registerNode
pub async fn register_node(
    State(state): State<RegistryState>,
    Json(request): Json<RegisterNodeRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    debug!("API: POST /registerNode for relay {}", request.node_id);

    if request.pub_key.trim().is_empty() {
        return Err(AppError::bad_request("pubKey is required"));
    }

    let public_key = RelayPublicKey::import(request.pub_key.trim())
        .map_err(|e| AppError::bad_request(format!("invalid pubKey: {}", e)))?;

    state.directory.register(request.node_id, public_key)?;

    Ok((StatusCode::CREATED, Json(MessageResponse::success())))
}

/// Handler for GET /getNodeRegistry
pub async fn get_node_registry(State(state): State<RegistryState>) -> Json<NodeRegistryResponse> {
    debug!("API: GET /getNodeRegistry");

    Json(NodeRegistryResponse {
        nodes: state.directory.list_public(),
    })
}
