use super::CryptoError;
use data_encoding::BASE64;
use onionmsg_common::protocol;
use rand::{CryptoRng, RngCore};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

/// RSA-OAEP keypair held by a relay.
///
/// The private half never leaves the relay; peeling only needs `&self`, so one
/// keypair can be shared behind an `Arc` by every concurrent peel.
#[derive(Clone)]
pub struct RelayKeyPair {
    private: RsaPrivateKey,
    public: RelayPublicKey,
}

impl RelayKeyPair {
    /// Generate a keypair with the default 2048-bit modulus
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with_bits(protocol::DEFAULT_MODULUS_BITS)
    }

    pub fn generate_with_bits(bits: usize) -> Result<Self, CryptoError> {
        Self::generate_with_rng(&mut rand::thread_rng(), bits)
    }

    /// Generate with custom RNG (for testing)
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        rng: &mut R,
        bits: usize,
    ) -> Result<Self, CryptoError> {
        if bits < protocol::MIN_MODULUS_BITS {
            return Err(CryptoError::InvalidModulus { bits });
        }

        let private = RsaPrivateKey::new(rng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private(private)
    }

    fn from_private(private: RsaPrivateKey) -> Result<Self, CryptoError> {
        let public = RelayPublicKey::from_rsa(RsaPublicKey::from(&private))?;
        Ok(Self { private, public })
    }

    pub fn public_key(&self) -> &RelayPublicKey {
        &self.public
    }

    /// Byte width of every key wrapped for this relay
    pub fn wrapped_key_len(&self) -> usize {
        self.private.size()
    }

    /// Recover a session key wrapped under our public key
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if wrapped.len() != self.wrapped_key_len() {
            return Err(CryptoError::KeyUnwrapFailed);
        }

        self.private
            .decrypt_blinded(&mut rand::thread_rng(), Oaep::new::<Sha256>(), wrapped)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::KeyUnwrapFailed)
    }

    /// Base64 PKCS#8 DER encoding of the private key
    pub fn export_private(&self) -> Result<Zeroizing<String>, CryptoError> {
        let der = self
            .private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(Zeroizing::new(BASE64.encode(der.as_bytes())))
    }

    /// Inverse of [`RelayKeyPair::export_private`]
    pub fn import_private(encoded: &str) -> Result<Self, CryptoError> {
        let der = Zeroizing::new(
            BASE64
                .decode(encoded.trim().as_bytes())
                .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?,
        );
        let private = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Self::from_private(private)
    }
}

impl fmt::Debug for RelayKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayKeyPair")
            .field("public_key", &self.public)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Public half of a relay keypair, as published in the directory
#[derive(Clone)]
pub struct RelayPublicKey {
    key: RsaPublicKey,
    /// SPKI DER, kept alongside so export and comparison are infallible
    der: Vec<u8>,
}

impl RelayPublicKey {
    fn from_rsa(key: RsaPublicKey) -> Result<Self, CryptoError> {
        let der = key
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?
            .as_bytes()
            .to_vec();
        Ok(Self { key, der })
    }

    /// Parse SPKI DER bytes
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        if key.size() * 8 < protocol::MIN_MODULUS_BITS {
            return Err(CryptoError::InvalidModulus {
                bits: key.size() * 8,
            });
        }
        Ok(Self {
            key,
            der: der.to_vec(),
        })
    }

    /// Base64 SPKI DER, the form the registry stores
    pub fn export(&self) -> String {
        BASE64.encode(&self.der)
    }

    /// Inverse of [`RelayPublicKey::export`]
    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        let der = BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::from_der(&der)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Byte width of every key wrapped under this public key
    pub fn wrapped_key_len(&self) -> usize {
        self.key.size()
    }

    /// Encrypt raw session key material with RSA-OAEP(SHA-256)
    pub fn wrap_key<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        key_material: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.key
            .encrypt(rng, Oaep::new::<Sha256>(), key_material)
            .map_err(|e| CryptoError::KeyWrapFailed(e.to_string()))
    }

    /// Short BLAKE3 fingerprint for logs
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(&self.der);
        hex::encode(&hash.as_bytes()[..8])
    }
}

impl PartialEq for RelayPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for RelayPublicKey {}

impl fmt::Debug for RelayPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelayPublicKey({})", self.fingerprint())
    }
}

impl fmt::Display for RelayPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

impl Serialize for RelayPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.export())
    }
}

impl<'de> Deserialize<'de> for RelayPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::import(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::relay_keys;

    #[test]
    fn test_wrapped_key_width_matches_modulus() {
        let keys = &relay_keys()[0];
        let mut rng = rand::thread_rng();

        assert_eq!(keys.wrapped_key_len(), 256);
        for len in [1usize, 16, 32] {
            let wrapped = keys.public_key().wrap_key(&mut rng, &vec![7u8; len]).unwrap();
            assert_eq!(wrapped.len(), keys.public_key().wrapped_key_len());
        }
    }

    #[test]
    fn test_wrap_unwrap() {
        let keys = &relay_keys()[0];
        let wrapped = keys
            .public_key()
            .wrap_key(&mut rand::thread_rng(), b"0123456789abcdef0123456789abcdef")
            .unwrap();

        let unwrapped = keys.unwrap_key(&wrapped).unwrap();
        assert_eq!(unwrapped.as_slice(), b"0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let keys = relay_keys();
        let wrapped = keys[0]
            .public_key()
            .wrap_key(&mut rand::thread_rng(), &[1u8; 32])
            .unwrap();

        assert!(matches!(
            keys[1].unwrap_key(&wrapped),
            Err(CryptoError::KeyUnwrapFailed)
        ));
    }

    #[test]
    fn test_public_key_export_import() {
        let keys = &relay_keys()[0];
        let exported = keys.public_key().export();

        let imported = RelayPublicKey::import(&exported).unwrap();
        assert_eq!(&imported, keys.public_key());
        assert_eq!(imported.fingerprint(), keys.public_key().fingerprint());
    }

    #[test]
    fn test_private_key_export_import() {
        let keys = &relay_keys()[1];
        let exported = keys.export_private().unwrap();

        let imported = RelayKeyPair::import_private(&exported).unwrap();
        assert_eq!(imported.public_key(), keys.public_key());

        let wrapped = keys
            .public_key()
            .wrap_key(&mut rand::thread_rng(), &[9u8; 32])
            .unwrap();
        assert_eq!(imported.unwrap_key(&wrapped).unwrap().as_slice(), &[9u8; 32]);
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(
            RelayPublicKey::import("not base64!"),
            Err(CryptoError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            RelayPublicKey::import(&BASE64.encode(b"definitely not der")),
            Err(CryptoError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_small_modulus_rejected() {
        assert!(matches!(
            RelayKeyPair::generate_with_bits(512),
            Err(CryptoError::InvalidModulus { bits: 512 })
        ));
    }

    #[test]
    fn test_public_key_serde_is_base64_string() {
        let keys = &relay_keys()[2];
        let json = serde_json::to_string(keys.public_key()).unwrap();
        assert_eq!(json, format!("\"{}\"", keys.public_key().export()));

        let back: RelayPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, keys.public_key());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let rendered = format!("{:?}", relay_keys()[0]);
        assert!(rendered.contains("<redacted>"));
    }
}
