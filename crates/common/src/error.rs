use thiserror::Error;

/// Errors raised by the glue around the onion core
#[derive(Debug, Error)]
pub enum OnionMsgError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Unknown relay: {0}")]
    UnknownRelay(u32),

    #[error("Unknown destination: {0}")]
    UnknownDestination(u32),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for glue operations
pub type Result<T> = std::result::Result<T, OnionMsgError>;

impl OnionMsgError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Whether the failure happened while moving bytes rather than processing them
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(OnionMsgError::network("refused").is_transport());
        assert!(!OnionMsgError::protocol("bad body").is_transport());
        assert_eq!(
            OnionMsgError::UnknownRelay(9).to_string(),
            "Unknown relay: 9"
        );
    }
}
