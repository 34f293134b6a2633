use crate::crypto::CryptoError;
use onionmsg_common::RelayId;

/// Failure kinds of the onion core.
///
/// Every variant is terminal for the message or layer being processed; the
/// core never retries and never hands back a partially built or peeled layer.
#[derive(Debug, thiserror::Error)]
pub enum OnionError {
    #[error("Insufficient relays: {available} available, {required} required")]
    InsufficientRelays { available: usize, required: usize },

    #[error("Circuit has no relays")]
    EmptyCircuit,

    #[error("Relay {0} appears more than once in the circuit")]
    DuplicateRelay(RelayId),

    #[error("Malformed layer: {0}")]
    MalformedLayer(String),

    #[error("Session key could not be unwrapped with this relay's key")]
    KeyUnwrapFailure,

    #[error("Layer payload failed to decrypt")]
    PayloadDecryptFailure,

    #[error("Crypto failure: {0}")]
    CryptoFailure(#[from] CryptoError),
}

impl OnionError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedLayer(msg.into())
    }
}
