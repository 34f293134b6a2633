use super::codec::LayerCodec;
use super::error::OnionError;
use super::types::{Layer, PeelResult};
use crate::crypto::{LayerCipher, RelayKeyPair, SessionKey};
use onionmsg_common::SymmetricSuite;
use tracing::{debug, warn};

/// Relay-side removal of exactly one onion layer.
///
/// Stateless: the keypair is only read, so any number of blobs can be peeled
/// concurrently with the same key. Dispatching the result (forwarding or
/// delivering) is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayPeeler {
    cipher: LayerCipher,
}

impl RelayPeeler {
    pub fn new(suite: SymmetricSuite) -> Self {
        Self {
            cipher: LayerCipher::new(suite),
        }
    }

    /// Remove our layer and report whether to forward or deliver
    pub fn peel(
        &self,
        blob: impl AsRef<[u8]>,
        keys: &RelayKeyPair,
    ) -> Result<PeelResult, OnionError> {
        let blob = blob.as_ref();
        let (wrapped_key, sealed) = LayerCodec::decode_layer(blob, keys.wrapped_key_len())?;

        let key_material = keys.unwrap_key(wrapped_key).map_err(|_| {
            warn!(
                "Could not unwrap session key with key {}",
                keys.public_key().fingerprint()
            );
            OnionError::KeyUnwrapFailure
        })?;
        let session_key =
            SessionKey::import(&key_material).map_err(|_| OnionError::KeyUnwrapFailure)?;

        let (iv, cipher_bytes) = LayerCodec::split_iv(sealed)?;
        let inner = self
            .cipher
            .decrypt(&session_key, iv, cipher_bytes)
            .map_err(|_| OnionError::PayloadDecryptFailure)?;

        let layer = LayerCodec::decode_inner(&inner)?;
        match &layer {
            Layer::Forward {
                next_hop,
                inner_blob,
            } => debug!(
                "Peeled {} byte layer: forward {} bytes to relay {}",
                blob.len(),
                inner_blob.len(),
                next_hop
            ),
            Layer::Deliver {
                destination,
                plaintext,
            } => debug!(
                "Peeled {} byte layer: deliver {} bytes to {}",
                blob.len(),
                plaintext.len(),
                destination
            ),
        }

        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::IV_LEN;
    use crate::onion::builder::OnionBuilder;
    use crate::onion::types::OnionBlob;
    use crate::test_support::{descriptors, relay_keys};
    use onionmsg_common::{DestinationId, RelayId};
    use proptest::prelude::*;

    fn three_hop_blob() -> OnionBlob {
        OnionBuilder::default()
            .build(b"tamper me", DestinationId::new(5), &descriptors(3))
            .unwrap()
    }

    #[test]
    fn test_wrong_key_fails_unwrap() {
        let keys = relay_keys();
        let blob = three_hop_blob();

        for wrong in &keys[1..] {
            assert!(matches!(
                RelayPeeler::default().peel(&blob, wrong),
                Err(OnionError::KeyUnwrapFailure)
            ));
        }
    }

    #[test]
    fn test_inner_layer_not_openable_by_entry() {
        let keys = relay_keys();
        let peeler = RelayPeeler::default();

        let inner = match peeler.peel(three_hop_blob(), &keys[0]).unwrap() {
            Layer::Forward { inner_blob, .. } => inner_blob,
            other => panic!("Expected Forward, got {:?}", other),
        };

        // The entry relay cannot peel the middle relay's layer
        assert!(matches!(
            peeler.peel(&inner, &keys[0]),
            Err(OnionError::KeyUnwrapFailure)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails_decrypt() {
        let keys = relay_keys();
        let blob = three_hop_blob().into_vec();
        let width = keys[0].wrapped_key_len();

        // IV, body and tag are all covered
        for index in [width, width + IV_LEN, width + IV_LEN + 7, blob.len() - 1] {
            let mut tampered = blob.clone();
            tampered[index] ^= 0x80;
            assert!(matches!(
                RelayPeeler::default().peel(&tampered, &keys[0]),
                Err(OnionError::PayloadDecryptFailure)
            ));
        }
    }

    #[test]
    fn test_tampered_wrapped_key_fails_unwrap() {
        let keys = relay_keys();
        let mut blob = three_hop_blob().into_vec();
        blob[17] ^= 0x01;

        assert!(matches!(
            RelayPeeler::default().peel(&blob, &keys[0]),
            Err(OnionError::KeyUnwrapFailure)
        ));
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let keys = relay_keys();
        let blob = three_hop_blob().into_vec();

        assert!(matches!(
            RelayPeeler::default().peel(&blob[..256], &keys[0]),
            Err(OnionError::MalformedLayer(_))
        ));
        assert!(matches!(
            RelayPeeler::default().peel(&blob[..256 + IV_LEN], &keys[0]),
            Err(OnionError::MalformedLayer(_))
        ));
        assert!(matches!(
            RelayPeeler::default().peel(Vec::new(), &keys[0]),
            Err(OnionError::MalformedLayer(_))
        ));
    }

    #[test]
    fn test_intermediate_hops_name_next_relay() {
        let keys = relay_keys();
        let relays = descriptors(4);
        let peeler = RelayPeeler::default();

        let mut blob = OnionBuilder::default()
            .build(b"four hops", DestinationId::new(99), &relays)
            .unwrap();
        let mut visited: Vec<RelayId> = Vec::new();

        for (hop, key) in keys.iter().enumerate() {
            match peeler.peel(&blob, key).unwrap() {
                Layer::Forward {
                    next_hop,
                    inner_blob,
                } => {
                    assert_eq!(next_hop, relays[hop + 1].id);
                    visited.push(next_hop);
                    blob = inner_blob;
                }
                Layer::Deliver {
                    destination,
                    plaintext,
                } => {
                    assert_eq!(hop, relays.len() - 1);
                    assert_eq!(destination, DestinationId::new(99));
                    assert_eq!(plaintext, b"four hops");
                }
            }
        }

        assert_eq!(visited, relays[1..].iter().map(|r| r.id).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_peels_share_key() {
        let keys = relay_keys();
        let blobs: Vec<OnionBlob> = (0..4).map(|_| three_hop_blob()).collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = blobs
                .iter()
                .map(|blob| scope.spawn(move || RelayPeeler::default().peel(blob, &keys[0])))
                .collect();

            for handle in handles {
                assert!(matches!(
                    handle.join().unwrap(),
                    Ok(Layer::Forward { .. })
                ));
            }
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn peel_rejects_garbage_without_panicking(
            bytes in proptest::collection::vec(any::<u8>(), 0..400)
        ) {
            let result = RelayPeeler::default().peel(&bytes, &relay_keys()[0]);
            prop_assert!(matches!(
                result,
                Err(OnionError::MalformedLayer(_)) | Err(OnionError::KeyUnwrapFailure)
            ));
        }
    }
}
