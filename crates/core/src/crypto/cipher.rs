use super::CryptoError;
use aes_gcm::aead::{Aead, KeyInit, Nonce};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use onionmsg_common::SymmetricSuite;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Session key length (256-bit)
pub const SESSION_KEY_LEN: usize = 32;

/// IV prepended to every symmetric ciphertext
pub const IV_LEN: usize = 12;

/// AEAD authentication tag appended by both suites
pub const TAG_LEN: usize = 16;

/// Ephemeral per-hop, per-message symmetric key.
///
/// Wiped on drop. It only ever leaves the builder wrapped under a relay's
/// public key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    pub fn generate() -> Self {
        Self::generate_with_rng(&mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = [0u8; SESSION_KEY_LEN];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    /// Raw key material, ready to be wrapped
    pub fn export(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.0.to_vec())
    }

    pub fn import(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SESSION_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SESSION_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Symmetric half of a layer: AEAD with a random IV per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerCipher {
    suite: SymmetricSuite,
}

impl LayerCipher {
    pub fn new(suite: SymmetricSuite) -> Self {
        Self { suite }
    }

    pub fn suite(&self) -> SymmetricSuite {
        self.suite
    }

    /// Encrypt and return `iv ++ ciphertext`
    pub fn encrypt(&self, key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_with_rng(&mut rand::thread_rng(), key, plaintext)
    }

    pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        key: &SessionKey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut iv = [0u8; IV_LEN];
        rng.fill_bytes(&mut iv);

        let ciphertext = match self.suite {
            SymmetricSuite::Aes256Gcm => seal::<Aes256Gcm>(key, &iv, plaintext)?,
            SymmetricSuite::ChaCha20Poly1305 => seal::<ChaCha20Poly1305>(key, &iv, plaintext)?,
        };

        let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `ciphertext` under `iv`; any tampering fails authentication
    pub fn decrypt(
        &self,
        key: &SessionKey,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if iv.len() != IV_LEN {
            return Err(CryptoError::DecryptionFailed);
        }

        match self.suite {
            SymmetricSuite::Aes256Gcm => open::<Aes256Gcm>(key, iv, ciphertext),
            SymmetricSuite::ChaCha20Poly1305 => open::<ChaCha20Poly1305>(key, iv, ciphertext),
        }
    }
}

impl Default for LayerCipher {
    fn default() -> Self {
        Self::new(SymmetricSuite::default())
    }
}

fn seal<C: Aead + KeyInit>(
    key: &SessionKey,
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: SESSION_KEY_LEN,
        actual: key.as_bytes().len(),
    })?;

    cipher
        .encrypt(Nonce::<C>::from_slice(iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

fn open<C: Aead + KeyInit>(
    key: &SessionKey,
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: SESSION_KEY_LEN,
        actual: key.as_bytes().len(),
    })?;

    cipher
        .decrypt(Nonce::<C>::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}
