use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Wire protocol constants
pub mod protocol {
    /// Maximum accepted HTTP body (1 MB)
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    /// Timeout for a single hop-to-hop request
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Default RSA modulus for relay keys
    pub const DEFAULT_MODULUS_BITS: usize = 2048;

    /// Smallest modulus that still fits an OAEP-SHA256 wrapped session key
    pub const MIN_MODULUS_BITS: usize = 1024;
}

/// Circuit routing constants
pub mod routing {
    /// Default circuit length (number of hops)
    pub const DEFAULT_CIRCUIT_LENGTH: usize = 3;

    /// Minimum circuit length
    /// WARNING: 1-2 hop circuits provide reduced anonymity
    pub const MIN_CIRCUIT_LENGTH: usize = 1;

    /// Maximum circuit length
    pub const MAX_CIRCUIT_LENGTH: usize = 8;
}

/// Default listening ports of the local network
pub mod ports {
    pub const REGISTRY_PORT: u16 = 8080;

    /// Relay `n` listens on `BASE_RELAY_PORT + n`
    pub const BASE_RELAY_PORT: u16 = 4000;

    /// User `n` listens on `BASE_USER_PORT + n`
    pub const BASE_USER_PORT: u16 = 3000;
}

/// AEAD used for the symmetric part of every layer.
///
/// This is a network-wide parameter: senders and relays must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SymmetricSuite {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl fmt::Display for SymmetricSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymmetricSuite::Aes256Gcm => write!(f, "aes-256-gcm"),
            SymmetricSuite::ChaCha20Poly1305 => write!(f, "chacha20-poly1305"),
        }
    }
}

impl FromStr for SymmetricSuite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes" => Ok(SymmetricSuite::Aes256Gcm),
            "chacha20-poly1305" | "chacha" => Ok(SymmetricSuite::ChaCha20Poly1305),
            other => Err(ConfigError::ParseError(format!("unknown cipher suite '{}'", other))),
        }
    }
}

/// Network configuration shared by the registry, relays and users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host every participant binds to and is reached at
    pub host: String,

    /// Registry listen port
    pub registry_port: u16,

    /// Port offset for relays
    pub base_relay_port: u16,

    /// Port offset for users
    pub base_user_port: u16,

    /// Hops per circuit
    pub circuit_length: usize,

    /// RSA modulus size for relay keys
    pub modulus_bits: usize,

    /// Layer cipher
    pub cipher_suite: SymmetricSuite,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            registry_port: ports::REGISTRY_PORT,
            base_relay_port: ports::BASE_RELAY_PORT,
            base_user_port: ports::BASE_USER_PORT,
            circuit_length: routing::DEFAULT_CIRCUIT_LENGTH,
            modulus_bits: protocol::DEFAULT_MODULUS_BITS,
            cipher_suite: SymmetricSuite::default(),
            request_timeout_secs: protocol::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_registry_port(mut self, port: u16) -> Self {
        self.registry_port = port;
        self
    }

    pub fn with_base_ports(mut self, relay: u16, user: u16) -> Self {
        self.base_relay_port = relay;
        self.base_user_port = user;
        self
    }

    pub fn with_circuit_length(mut self, length: usize) -> Self {
        self.circuit_length = length.clamp(routing::MIN_CIRCUIT_LENGTH, routing::MAX_CIRCUIT_LENGTH);
        self
    }

    pub fn with_modulus_bits(mut self, bits: usize) -> Self {
        self.modulus_bits = bits;
        self
    }

    pub fn with_cipher_suite(mut self, suite: SymmetricSuite) -> Self {
        self.cipher_suite = suite;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Port of relay `id`, or `None` if it would overflow
    pub fn relay_port(&self, id: u32) -> Option<u16> {
        offset_port(self.base_relay_port, id)
    }

    /// Port of user `id`, or `None` if it would overflow
    pub fn user_port(&self, id: u32) -> Option<u16> {
        offset_port(self.base_user_port, id)
    }

    pub fn registry_url(&self) -> String {
        format!("http://{}:{}", self.host, self.registry_port)
    }

    /// Reject combinations the rest of the system cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modulus_bits < protocol::MIN_MODULUS_BITS {
            return Err(ConfigError::Invalid(format!(
                "modulus_bits must be at least {}, got {}",
                protocol::MIN_MODULUS_BITS,
                self.modulus_bits
            )));
        }
        if !(routing::MIN_CIRCUIT_LENGTH..=routing::MAX_CIRCUIT_LENGTH)
            .contains(&self.circuit_length)
        {
            return Err(ConfigError::Invalid(format!(
                "circuit_length must be within {}..={}, got {}",
                routing::MIN_CIRCUIT_LENGTH,
                routing::MAX_CIRCUIT_LENGTH,
                self.circuit_length
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }
}

fn offset_port(base: u16, id: u32) -> Option<u16> {
    u16::try_from(id).ok().and_then(|id| base.checked_add(id))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
