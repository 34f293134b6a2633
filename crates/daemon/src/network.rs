/// Launching node roles over HTTP
///
/// Each role binds `host:port` from [`NetworkConfig`]; relays announce their
/// key to the registry after binding and before serving.

use crate::api::{socket_addr, ApiServer};
use crate::transport::{HttpTransport, RegistryClient};
use crate::{registry, relay, user};
use anyhow::{anyhow, Context, Result};
use onionmsg_common::NetworkConfig;
use onionmsg_core::{DestinationId, MemoryDirectory, RelayId, RelayKeyPair};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

const REGISTRY_WAIT_ATTEMPTS: u32 = 50;
const REGISTRY_WAIT_INTERVAL: Duration = Duration::from_millis(100);

/// Run the relay directory
pub async fn run_registry(config: &NetworkConfig) -> Result<()> {
    let addr = socket_addr(&config.host, config.registry_port)?;
    let server = ApiServer::bind("Registry", addr).await?;

    server
        .serve(registry::router(Arc::new(MemoryDirectory::new())))
        .await
}

/// Run relay `id`: generate a keypair, register it, then serve
pub async fn run_relay(config: &NetworkConfig, id: RelayId) -> Result<()> {
    let port = config
        .relay_port(id.value())
        .ok_or_else(|| anyhow!("relay id {} has no port", id))?;
    let server = ApiServer::bind(format!("Relay {}", id), socket_addr(&config.host, port)?).await?;

    let bits = config.modulus_bits;
    let keys = tokio::task::spawn_blocking(move || RelayKeyPair::generate_with_bits(bits))
        .await
        .context("key generation task failed")??;
    info!(
        "Relay {} generated {}-bit key {}",
        id,
        bits,
        keys.public_key().fingerprint()
    );

    let registry = RegistryClient::new(config)?;
    wait_for_registry(&registry).await?;
    registry.register(id, keys.public_key()).await?;

    let transport = Arc::new(HttpTransport::new(config.clone())?);
    let node = Arc::new(relay::RelayNode::new(
        id,
        keys,
        config.cipher_suite,
        transport,
    ));

    server.serve(relay::router(node)).await
}

/// Run user `id`
pub async fn run_user(config: &NetworkConfig, id: DestinationId) -> Result<()> {
    let port = config
        .user_port(id.value())
        .ok_or_else(|| anyhow!("user id {} has no port", id))?;
    let server = ApiServer::bind(format!("User {}", id), socket_addr(&config.host, port)?).await?;

    let node = Arc::new(user::UserNode::new(
        id,
        config,
        Arc::new(RegistryClient::new(config)?),
        Arc::new(HttpTransport::new(config.clone())?),
    ));

    server.serve(user::router(node)).await
}

/// Run a registry, `relays` relays and `users` users in one process.
///
/// Ids start at 1. Returns when any node stops.
pub async fn run_local_network(config: &NetworkConfig, relays: u32, users: u32) -> Result<()> {
    let mut nodes = JoinSet::new();

    let registry_config = config.clone();
    nodes.spawn(async move { run_registry(&registry_config).await });

    for id in 1..=relays {
        let config = config.clone();
        nodes.spawn(async move { run_relay(&config, RelayId::new(id)).await });
    }

    for id in 1..=users {
        let config = config.clone();
        nodes.spawn(async move { run_user(&config, DestinationId::new(id)).await });
    }

    info!(
        "Local network starting: registry on {}, {} relays, {} users",
        config.registry_url(),
        relays,
        users
    );

    match nodes.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(e)) => Err(anyhow!("node task failed: {}", e)),
        None => Ok(()),
    }
}

async fn wait_for_registry(registry: &RegistryClient) -> Result<()> {
    for attempt in 1..=REGISTRY_WAIT_ATTEMPTS {
        if registry.is_live().await {
            return Ok(());
        }
        if attempt == 1 {
            warn!("Registry at {} not reachable yet, retrying", registry.base_url());
        }
        tokio::time::sleep(REGISTRY_WAIT_INTERVAL).await;
    }
    Err(anyhow!("registry at {} never came up", registry.base_url()))
}
