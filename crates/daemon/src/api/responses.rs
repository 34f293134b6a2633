/// API request and response bodies

use onionmsg_core::{DestinationId, RelayDescriptor, RelayId};
use serde::{Deserialize, Serialize};

/// Generic acknowledgement, e.g. `{"message": "success"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn success() -> Self {
        Self {
            message: "success".to_string(),
        }
    }
}

/// Wrapper for the `getLast*` observation endpoints; `result` is `null`
/// until something has been observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse<T> {
    pub result: Option<T>,
}

impl<T> ResultResponse<T> {
    pub fn new(result: Option<T>) -> Self {
        Self { result }
    }
}

/// Relay registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterNodeRequest {
    #[serde(rename = "nodeId")]
    pub node_id: RelayId,

    /// Base64 SPKI public key
    #[serde(rename = "pubKey")]
    pub pub_key: String,
}

/// Full relay directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistryResponse {
    pub nodes: Vec<RelayDescriptor>,
}

/// Onion handed to a relay; `message` is the base64 blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnionMessageRequest {
    pub message: String,
}

/// Plaintext a user wants to send anonymously
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,

    #[serde(rename = "destinationUserId")]
    pub destination_user_id: DestinationId,
}

/// Plaintext delivered by an exit relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveMessageRequest {
    pub message: String,
}

/// Where a relay last sent what it peeled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HopTarget {
    Relay(RelayId),
    User(DestinationId),
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}
