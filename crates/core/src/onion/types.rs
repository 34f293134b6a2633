use super::error::OnionError;
use crate::crypto::RelayPublicKey;
use data_encoding::BASE64;
use onionmsg_common::{DestinationId, RelayId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A relay as published by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDescriptor {
    #[serde(rename = "nodeId")]
    pub id: RelayId,

    #[serde(rename = "pubKey")]
    pub public_key: RelayPublicKey,
}

impl RelayDescriptor {
    pub fn new(id: RelayId, public_key: RelayPublicKey) -> Self {
        Self { id, public_key }
    }
}

/// Ordered path of distinct relays (entry first) plus the final recipient.
///
/// Built fresh for every message and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    hops: Vec<RelayDescriptor>,
    destination: DestinationId,
}

impl Circuit {
    pub fn new(hops: Vec<RelayDescriptor>, destination: DestinationId) -> Result<Self, OnionError> {
        ensure_distinct(&hops)?;
        Ok(Self { hops, destination })
    }

    pub fn hops(&self) -> &[RelayDescriptor] {
        &self.hops
    }

    pub fn destination(&self) -> DestinationId {
        self.destination
    }

    pub fn length(&self) -> usize {
        self.hops.len()
    }

    pub fn entry(&self) -> &RelayDescriptor {
        &self.hops[0]
    }

    pub fn exit(&self) -> &RelayDescriptor {
        &self.hops[self.hops.len() - 1]
    }

    pub fn relay_ids(&self) -> Vec<RelayId> {
        self.hops.iter().map(|hop| hop.id).collect()
    }
}

/// Reject empty paths and paths that visit a relay twice
pub(crate) fn ensure_distinct(hops: &[RelayDescriptor]) -> Result<(), OnionError> {
    if hops.is_empty() {
        return Err(OnionError::EmptyCircuit);
    }

    let mut seen = HashSet::with_capacity(hops.len());
    for hop in hops {
        if !seen.insert(hop.id) {
            return Err(OnionError::DuplicateRelay(hop.id));
        }
    }
    Ok(())
}

/// Opaque bytes moved between hops
#[derive(Clone, PartialEq, Eq)]
pub struct OnionBlob(Vec<u8>);

impl OnionBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Transport encoding used in JSON bodies
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, OnionError> {
        BASE64
            .decode(encoded.trim().as_bytes())
            .map(Self)
            .map_err(|e| OnionError::malformed(format!("invalid base64 blob: {}", e)))
    }
}

impl From<Vec<u8>> for OnionBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for OnionBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for OnionBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OnionBlob({} bytes)", self.0.len())
    }
}

/// Decrypted content of one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    /// Hand `inner_blob` to relay `next_hop`
    Forward {
        next_hop: RelayId,
        inner_blob: OnionBlob,
    },

    /// Hand `plaintext` to the final recipient
    Deliver {
        destination: DestinationId,
        plaintext: Vec<u8>,
    },
}

/// What a relay learns from peeling exactly one layer
pub type PeelResult = Layer;

impl Layer {
    pub fn is_deliver(&self) -> bool {
        matches!(self, Layer::Deliver { .. })
    }
}
