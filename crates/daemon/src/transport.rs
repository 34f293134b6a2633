/// Moving onions and plaintext between nodes
///
/// The core never touches the network. Relays hand peeled layers to a
/// [`Transport`], users fetch the relay directory through a [`RelaySource`],
/// and the HTTP implementations below map ids onto `host:base_port + id`.

use crate::api::{
    NodeRegistryResponse, OnionMessageRequest, ReceiveMessageRequest, RegisterNodeRequest,
};
use async_trait::async_trait;
use onionmsg_common::{NetworkConfig, OnionMsgError};
use onionmsg_core::{
    DestinationId, Directory, MemoryDirectory, OnionBlob, RelayDescriptor, RelayId,
    RelayPublicKey,
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

/// Delivery of opaque bytes to the next hop
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand an onion to a relay
    async fn send_to_relay(&self, relay: RelayId, blob: &OnionBlob) -> Result<(), OnionMsgError>;

    /// Hand the recovered plaintext to its final recipient
    async fn deliver(&self, destination: DestinationId, plaintext: &[u8])
        -> Result<(), OnionMsgError>;
}

/// Where a sender learns the current relay set
#[async_trait]
pub trait RelaySource: Send + Sync {
    async fn fetch_relays(&self) -> Result<Vec<RelayDescriptor>, OnionMsgError>;
}

#[async_trait]
impl RelaySource for MemoryDirectory {
    async fn fetch_relays(&self) -> Result<Vec<RelayDescriptor>, OnionMsgError> {
        Ok(self.list_public())
    }
}

fn build_client(config: &NetworkConfig) -> Result<Client, OnionMsgError> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| OnionMsgError::network(format!("failed to build HTTP client: {}", e)))
}

async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &T,
) -> Result<StatusCode, OnionMsgError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| OnionMsgError::network(format!("POST {} failed: {}", url, e)))?;
    Ok(response.status())
}

/// JSON-over-HTTP transport between local nodes
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: NetworkConfig,
}

impl HttpTransport {
    pub fn new(config: NetworkConfig) -> Result<Self, OnionMsgError> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    pub fn relay_url(&self, relay: RelayId) -> Result<String, OnionMsgError> {
        let port = self
            .config
            .relay_port(relay.value())
            .ok_or(OnionMsgError::UnknownRelay(relay.value()))?;
        Ok(format!("http://{}:{}/message", self.config.host, port))
    }

    pub fn user_url(&self, destination: DestinationId) -> Result<String, OnionMsgError> {
        let port = self
            .config
            .user_port(destination.value())
            .ok_or(OnionMsgError::UnknownDestination(destination.value()))?;
        Ok(format!("http://{}:{}/receiveMessage", self.config.host, port))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_to_relay(&self, relay: RelayId, blob: &OnionBlob) -> Result<(), OnionMsgError> {
        let url = self.relay_url(relay)?;
        debug!("Forwarding {} byte onion to relay {} at {}", blob.len(), relay, url);

        let status = post_json(
            &self.client,
            &url,
            &OnionMessageRequest {
                message: blob.to_base64(),
            },
        )
        .await?;

        if !status.is_success() {
            return Err(OnionMsgError::network(format!(
                "relay {} answered {}",
                relay, status
            )));
        }
        Ok(())
    }

    async fn deliver(
        &self,
        destination: DestinationId,
        plaintext: &[u8],
    ) -> Result<(), OnionMsgError> {
        let url = self.user_url(destination)?;
        debug!("Delivering {} bytes to user {} at {}", plaintext.len(), destination, url);

        let status = post_json(
            &self.client,
            &url,
            &ReceiveMessageRequest {
                message: String::from_utf8_lossy(plaintext).into_owned(),
            },
        )
        .await?;

        if !status.is_success() {
            return Err(OnionMsgError::network(format!(
                "user {} answered {}",
                destination, status
            )));
        }
        Ok(())
    }
}

/// Client for the registry's HTTP API
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(config: &NetworkConfig) -> Result<Self, OnionMsgError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.registry_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Publish a relay's public key
    pub async fn register(
        &self,
        relay: RelayId,
        public_key: &RelayPublicKey,
    ) -> Result<(), OnionMsgError> {
        let url = format!("{}/registerNode", self.base_url);
        let status = post_json(
            &self.client,
            &url,
            &RegisterNodeRequest {
                node_id: relay,
                pub_key: public_key.export(),
            },
        )
        .await?;

        match status {
            StatusCode::CREATED => {
                info!("Relay {} registered with {}", relay, self.base_url);
                Ok(())
            }
            StatusCode::CONFLICT => Err(OnionMsgError::registry(format!(
                "relay {} is already registered",
                relay
            ))),
            other => Err(OnionMsgError::registry(format!(
                "registration of relay {} rejected with {}",
                relay, other
            ))),
        }
    }

    /// Liveness probe against `/status`
    pub async fn is_live(&self) -> bool {
        match self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl RelaySource for RegistryClient {
    async fn fetch_relays(&self) -> Result<Vec<RelayDescriptor>, OnionMsgError> {
        let url = format!("{}/getNodeRegistry", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OnionMsgError::network(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(OnionMsgError::registry(format!(
                "registry answered {}",
                response.status()
            )));
        }

        let registry: NodeRegistryResponse = response
            .json()
            .await
            .map_err(|e| OnionMsgError::serialization(format!("bad registry listing: {}", e)))?;

        debug!("Fetched {} relays from {}", registry.nodes.len(), self.base_url);
        Ok(registry.nodes)
    }
}
