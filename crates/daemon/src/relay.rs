/// Relay node
///
/// Owns one keypair, peels exactly one layer off every onion it receives and
/// either forwards the remainder to the next relay or delivers the plaintext.
/// The last blob seen, what came out of it and where it went are kept for
/// inspection over HTTP.

use crate::api::{AppError, HopTarget, MessageResponse, OnionMessageRequest, ResultResponse};
use crate::transport::Transport;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use onionmsg_core::{
    OnionBlob, PeelResult, RelayId, RelayKeyPair, RelayPeeler, SymmetricSuite,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
struct RelayObservations {
    last_encrypted: Option<String>,
    last_decrypted: Option<String>,
    last_destination: Option<HopTarget>,
}

/// A single relay and its dispatch logic
pub struct RelayNode {
    id: RelayId,
    keys: Arc<RelayKeyPair>,
    peeler: RelayPeeler,
    transport: Arc<dyn Transport>,
    observed: RwLock<RelayObservations>,
}

impl RelayNode {
    pub fn new(
        id: RelayId,
        keys: RelayKeyPair,
        suite: SymmetricSuite,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            id,
            keys: Arc::new(keys),
            peeler: RelayPeeler::new(suite),
            transport,
            observed: RwLock::new(RelayObservations::default()),
        }
    }

    pub fn id(&self) -> RelayId {
        self.id
    }

    pub fn keys(&self) -> &RelayKeyPair {
        &self.keys
    }

    /// Peel one layer and pass the result on
    pub async fn handle_onion(&self, blob: OnionBlob) -> Result<HopTarget, AppError> {
        self.observed.write().await.last_encrypted = Some(blob.to_base64());

        // RSA decryption is CPU-bound; keep it off the async workers
        let keys = self.keys.clone();
        let peeler = self.peeler;
        let peeled = tokio::task::spawn_blocking(move || peeler.peel(&blob, &keys))
            .await
            .map_err(|e| AppError::internal(format!("peel task failed: {}", e)))?;

        let layer = match peeled {
            Ok(layer) => layer,
            Err(err) => {
                warn!("Relay {} dropped an onion: {}", self.id, err);
                return Err(err.into());
            }
        };

        let target = self.record(&layer).await;
        match layer {
            PeelResult::Forward {
                next_hop,
                inner_blob,
            } => {
                debug!("Relay {} forwarding to relay {}", self.id, next_hop);
                self.transport.send_to_relay(next_hop, &inner_blob).await?;
            }
            PeelResult::Deliver {
                destination,
                plaintext,
            } => {
                info!("Relay {} delivering to user {}", self.id, destination);
                self.transport.deliver(destination, &plaintext).await?;
            }
        }

        Ok(target)
    }

    async fn record(&self, layer: &PeelResult) -> HopTarget {
        let (decrypted, target) = match layer {
            PeelResult::Forward {
                next_hop,
                inner_blob,
            } => (inner_blob.to_base64(), HopTarget::Relay(*next_hop)),
            PeelResult::Deliver {
                destination,
                plaintext,
            } => (
                String::from_utf8_lossy(plaintext).into_owned(),
                HopTarget::User(*destination),
            ),
        };

        let mut observed = self.observed.write().await;
        observed.last_decrypted = Some(decrypted);
        observed.last_destination = Some(target);
        target
    }

    pub async fn last_encrypted(&self) -> Option<String> {
        self.observed.read().await.last_encrypted.clone()
    }

    pub async fn last_decrypted(&self) -> Option<String> {
        self.observed.read().await.last_decrypted.clone()
    }

    pub async fn last_destination(&self) -> Option<HopTarget> {
        self.observed.read().await.last_destination
    }
}

/// Build the relay router
pub fn router(node: Arc<RelayNode>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/message", post(receive_onion))
        .route(
            "/getLastReceivedEncryptedMessage",
            get(get_last_encrypted),
        )
        .route(
            "/getLastReceivedDecryptedMessage",
            get(get_last_decrypted),
        )
        .route("/getLastMessageDestination", get(get_last_destination))
        .layer(CorsLayer::permissive())
        .with_state(node)
}

/// Handler for GET /status
pub async fn status() -> &'static str {
    "live"
}

/// Handler for POST /message
pub async fn receive_onion(
    State(node): State<Arc<RelayNode>>,
    Json(request): Json<OnionMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    debug!("API: POST /message on relay {}", node.id());

    let blob = OnionBlob::from_base64(request.message.trim())?;
    if blob.is_empty() {
        return Err(AppError::bad_request("message is required"));
    }

    node.handle_onion(blob).await?;
    Ok(Json(MessageResponse::success()))
}

/// Handler for GET /getLastReceivedEncryptedMessage
pub async fn get_last_encrypted(
    State(node): State<Arc<RelayNode>>,
) -> Json<ResultResponse<String>> {
    Json(ResultResponse::new(node.last_encrypted().await))
}

/// Handler for GET /getLastReceivedDecryptedMessage
pub async fn get_last_decrypted(
    State(node): State<Arc<RelayNode>>,
) -> Json<ResultResponse<String>> {
    Json(ResultResponse::new(node.last_decrypted().await))
}

/// Handler for GET /getLastMessageDestination
pub async fn get_last_destination(
    State(node): State<Arc<RelayNode>>,
) -> Json<ResultResponse<HopTarget>> {
    Json(ResultResponse::new(node.last_destination().await))
}
