/// Relay directory
///
/// The directory is the only shared state in the system: a read-mostly set
/// of `{id, public key}` records. The core talks to it through the
/// [`Directory`] trait so the backing store can be swapped without touching
/// circuit selection or onion construction.

use crate::crypto::RelayPublicKey;
use crate::onion::{CircuitSelector, OnionError, RelayDescriptor};
use onionmsg_common::RelayId;
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Registry of relay identities
pub trait Directory: Send + Sync {
    /// Add a relay; ids are unique
    fn register(&self, id: RelayId, public_key: RelayPublicKey) -> Result<(), DirectoryError>;

    /// Every known relay, ordered by id
    fn list_public(&self) -> Vec<RelayDescriptor>;

    /// `k` distinct relays in random order
    fn random_subset(
        &self,
        k: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<RelayDescriptor>, DirectoryError> {
        CircuitSelector::sample_distinct(&self.list_public(), k, &HashSet::new(), rng).map_err(
            |err| match err {
                OnionError::InsufficientRelays {
                    available,
                    required,
                } => DirectoryError::InsufficientRelays {
                    available,
                    required,
                },
                _ => DirectoryError::EmptySubset,
            },
        )
    }

    fn lookup(&self, id: RelayId) -> Option<RelayDescriptor> {
        self.list_public().into_iter().find(|relay| relay.id == id)
    }
}

/// In-memory directory; contents do not survive a restart
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    relays: RwLock<BTreeMap<RelayId, RelayDescriptor>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.relays.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.read().is_empty()
    }
}

impl Directory for MemoryDirectory {
    fn register(&self, id: RelayId, public_key: RelayPublicKey) -> Result<(), DirectoryError> {
        let mut relays = self.relays.write();
        if relays.contains_key(&id) {
            debug!("Rejected duplicate registration for relay {}", id);
            return Err(DirectoryError::AlreadyRegistered(id));
        }

        info!(
            "Registered relay {} with key {}",
            id,
            public_key.fingerprint()
        );
        relays.insert(id, RelayDescriptor::new(id, public_key));
        Ok(())
    }

    fn list_public(&self) -> Vec<RelayDescriptor> {
        self.relays.read().values().cloned().collect()
    }

    fn lookup(&self, id: RelayId) -> Option<RelayDescriptor> {
        self.relays.read().get(&id).cloned()
    }
}

/// Directory errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Relay {0} is already registered")]
    AlreadyRegistered(RelayId),

    #[error("Insufficient relays: {available} available, {required} required")]
    InsufficientRelays { available: usize, required: usize },

    #[error("Requested an empty relay subset")]
    EmptySubset,
}
