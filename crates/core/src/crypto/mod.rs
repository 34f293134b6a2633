//! Key and cipher primitives used to wrap and unwrap onion layers.
//!
//! Relays hold RSA-OAEP(SHA-256) keypairs; every layer carries a fresh
//! 256-bit session key wrapped under the relay's public key, and the layer
//! body is sealed with an AEAD under that session key.

mod cipher;
mod keys;

pub use cipher::{LayerCipher, SessionKey, IV_LEN, SESSION_KEY_LEN, TAG_LEN};
pub use keys::{RelayKeyPair, RelayPublicKey};

/// Cryptographic errors
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("RSA modulus of {bits} bits is too small")]
    InvalidModulus { bits: usize },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key wrapping failed: {0}")]
    KeyWrapFailed(String),

    #[error("Key unwrapping failed")]
    KeyUnwrapFailed,

    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}
