pub mod config;
pub mod error;

pub use config::{ports, protocol, routing, ConfigError, NetworkConfig, SymmetricSuite};
pub use error::OnionMsgError;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Width of a routing id inside a decrypted layer.
pub const ID_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid id length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid id: {0}")]
    Parse(String),
}

/// Identifier of a relay registered in the directory.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(u32);

/// Identifier of a final recipient. Lives in a separate namespace from relays.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(u32);

macro_rules! routing_id {
    ($name:ident, $label:literal) => {
        impl $name {
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> u32 {
                self.0
            }

            pub fn to_bytes(&self) -> [u8; ID_LEN] {
                self.0.to_be_bytes()
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
                let array: [u8; ID_LEN] =
                    bytes.try_into().map_err(|_| IdError::InvalidLength {
                        expected: ID_LEN,
                        actual: bytes.len(),
                    })?;
                Ok(Self(u32::from_be_bytes(array)))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self::new(value)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = IdError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                Self::from_slice(value)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|err| IdError::Parse(err.to_string()))
            }
        }
    };
}

routing_id!(RelayId, "RelayId");
routing_id!(DestinationId, "DestinationId");
