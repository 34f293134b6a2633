/// User node
///
/// Sends by fetching the relay directory, choosing a fresh circuit and
/// handing the built onion to the entry relay. Receives plaintext pushed by
/// exit relays.

use crate::api::{
    AppError, MessageResponse, ReceiveMessageRequest, ResultResponse, SendMessageRequest,
};
use crate::transport::{RelaySource, Transport};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use onionmsg_common::{protocol, NetworkConfig};
use onionmsg_core::{Circuit, CircuitSelector, DestinationId, OnionBuilder, RelayId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
struct UserObservations {
    last_received: Option<String>,
    last_sent: Option<String>,
    last_circuit: Option<Vec<RelayId>>,
}

/// A message endpoint that originates onions
pub struct UserNode {
    id: DestinationId,
    circuit_length: usize,
    builder: OnionBuilder,
    relays: Arc<dyn RelaySource>,
    transport: Arc<dyn Transport>,
    observed: RwLock<UserObservations>,
}

impl UserNode {
    pub fn new(
        id: DestinationId,
        config: &NetworkConfig,
        relays: Arc<dyn RelaySource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            id,
            circuit_length: config.circuit_length,
            builder: OnionBuilder::new(config.cipher_suite),
            relays,
            transport,
            observed: RwLock::new(UserObservations::default()),
        }
    }

    pub fn id(&self) -> DestinationId {
        self.id
    }

    /// Route `message` to `destination` over a freshly selected circuit
    pub async fn send(&self, message: &str, destination: DestinationId) -> Result<Circuit, AppError> {
        let pool = self.relays.fetch_relays().await?;

        let circuit = CircuitSelector::select_circuit(
            &pool,
            self.circuit_length,
            destination,
            &mut rand::thread_rng(),
        )?;
        let blob = self.builder.build_for_circuit(message.as_bytes(), &circuit)?;

        info!(
            "User {} sending {} byte onion to {} via {:?}",
            self.id,
            blob.len(),
            destination,
            circuit.relay_ids()
        );

        {
            let mut observed = self.observed.write().await;
            observed.last_sent = Some(message.to_string());
            observed.last_circuit = Some(circuit.relay_ids());
        }

        self.transport
            .send_to_relay(circuit.entry().id, &blob)
            .await?;

        Ok(circuit)
    }

    /// Accept a plaintext delivered by an exit relay
    pub async fn receive(&self, message: String) {
        debug!("User {} received {} bytes", self.id, message.len());
        self.observed.write().await.last_received = Some(message);
    }

    pub async fn last_received(&self) -> Option<String> {
        self.observed.read().await.last_received.clone()
    }

    pub async fn last_sent(&self) -> Option<String> {
        self.observed.read().await.last_sent.clone()
    }

    pub async fn last_circuit(&self) -> Option<Vec<RelayId>> {
        self.observed.read().await.last_circuit.clone()
    }
}

/// Build the user router
pub fn router(node: Arc<UserNode>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/message", post(send_message))
        .route("/receiveMessage", post(receive_message))
        .route("/getLastReceivedMessage", get(get_last_received))
        .route("/getLastSentMessage", get(get_last_sent))
        .route("/getLastCircuit", get(get_last_circuit))
        .layer(CorsLayer::permissive())
        .with_state(node)
}

/// Handler for GET /status
pub async fn status() -> &'static str {
    "live"
}

/// Handler for POST /message
pub async fn send_message(
    State(node): State<Arc<UserNode>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    debug!(
        "API: POST /message on user {} to {}",
        node.id(),
        request.destination_user_id
    );

    if request.message.is_empty() {
        return Err(AppError::bad_request("message is required"));
    }
    if request.message.len() > protocol::MAX_MESSAGE_SIZE {
        return Err(AppError::bad_request(format!(
            "message exceeds {} bytes",
            protocol::MAX_MESSAGE_SIZE
        )));
    }

    node.send(&request.message, request.destination_user_id)
        .await?;
    Ok(Json(MessageResponse::success()))
}

/// Handler for POST /receiveMessage
pub async fn receive_message(
    State(node): State<Arc<UserNode>>,
    Json(request): Json<ReceiveMessageRequest>,
) -> Json<MessageResponse> {
    node.receive(request.message).await;
    Json(MessageResponse::success())
}

/// Handler for GET /getLastReceivedMessage
pub async fn get_last_received(State(node): State<Arc<UserNode>>) -> Json<ResultResponse<String>> {
    Json(ResultResponse::new(node.last_received().await))
}

/// Handler for GET /getLastSentMessage
pub async fn get_last_sent(State(node): State<Arc<UserNode>>) -> Json<ResultResponse<String>> {
    Json(ResultResponse::new(node.last_sent().await))
}

/// Handler for GET /getLastCircuit
pub async fn get_last_circuit(
    State(node): State<Arc<UserNode>>,
) -> Json<ResultResponse<Vec<RelayId>>> {
    Json(ResultResponse::new(node.last_circuit().await))
}
