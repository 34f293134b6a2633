/// Client-side onion construction
///
/// Layers are sealed innermost first, walking the circuit from the exit relay
/// back to the entry relay:
/// 1. The exit relay's plaintext is `DELIVER(destination, message)`
/// 2. Every earlier relay's plaintext is `FORWARD(next relay, next relay's layer)`
/// 3. Each plaintext is sealed under a fresh session key, and that key is
///    wrapped with RSA-OAEP under the relay's own public key
///
/// The routing instruction for hop `i + 1` therefore sits inside the layer
/// only relay `i` can open.

use super::codec::LayerCodec;
use super::error::OnionError;
use super::types::{ensure_distinct, Circuit, OnionBlob, RelayDescriptor};
use crate::crypto::{CryptoError, LayerCipher, SessionKey};
use onionmsg_common::{DestinationId, RelayId, SymmetricSuite};
use rand::{CryptoRng, RngCore};
use tracing::debug;

/// Builds layered onions for a fixed symmetric suite
#[derive(Debug, Clone, Copy, Default)]
pub struct OnionBuilder {
    cipher: LayerCipher,
}

impl OnionBuilder {
    pub fn new(suite: SymmetricSuite) -> Self {
        Self {
            cipher: LayerCipher::new(suite),
        }
    }

    /// Wrap `plaintext` for `destination` through `relays` (entry first)
    pub fn build(
        &self,
        plaintext: &[u8],
        destination: DestinationId,
        relays: &[RelayDescriptor],
    ) -> Result<OnionBlob, OnionError> {
        self.build_with_rng(&mut rand::thread_rng(), plaintext, destination, relays)
    }

    /// Same as [`OnionBuilder::build`], taking the path and destination from a circuit
    pub fn build_for_circuit(
        &self,
        plaintext: &[u8],
        circuit: &Circuit,
    ) -> Result<OnionBlob, OnionError> {
        self.build(plaintext, circuit.destination(), circuit.hops())
    }

    pub fn build_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        destination: DestinationId,
        relays: &[RelayDescriptor],
    ) -> Result<OnionBlob, OnionError> {
        ensure_distinct(relays)?;

        let mut payload = LayerCodec::encode_deliver(destination, plaintext);
        let mut next_hop: Option<RelayId> = None;

        for relay in relays.iter().rev() {
            // Every relay except the exit learns where to send the remainder
            if let Some(next) = next_hop {
                payload = LayerCodec::encode_forward(next, &payload);
            }

            payload = self.seal_layer(rng, relay, &payload)?;
            next_hop = Some(relay.id);
        }

        debug!(
            "Built {}-hop onion for destination {} ({} bytes)",
            relays.len(),
            destination,
            payload.len()
        );

        Ok(OnionBlob::new(payload))
    }

    /// Seal one relay's plaintext: `wrap(pk, k) || iv || aead(k, payload)`
    fn seal_layer<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        relay: &RelayDescriptor,
        payload: &[u8],
    ) -> Result<Vec<u8>, OnionError> {
        let session_key = SessionKey::generate_with_rng(rng);
        let sealed = self.cipher.encrypt_with_rng(rng, &session_key, payload)?;
        let wrapped_key = relay.public_key.wrap_key(rng, &session_key.export())?;

        let expected = relay.public_key.wrapped_key_len();
        if wrapped_key.len() != expected {
            return Err(CryptoError::KeyWrapFailed(format!(
                "wrapped key is {} bytes, expected {}",
                wrapped_key.len(),
                expected
            ))
            .into());
        }

        debug!(
            "Sealed layer for relay {} (key {}, {} byte payload)",
            relay.id,
            relay.public_key.fingerprint(),
            payload.len()
        );

        Ok(LayerCodec::encode_layer(&wrapped_key, &sealed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{IV_LEN, TAG_LEN};
    use crate::onion::codec::INNER_HEADER_LEN;
    use crate::onion::peeler::RelayPeeler;
    use crate::onion::types::Layer;
    use crate::test_support::{descriptors, relay_keys};

    const LAYER_OVERHEAD: usize = 256 + IV_LEN + TAG_LEN + INNER_HEADER_LEN;

    #[test]
    fn test_three_hop_scenario() {
        let keys = relay_keys();
        let relays = descriptors(3);
        let user = DestinationId::new(7);
        let builder = OnionBuilder::default();
        let peeler = RelayPeeler::default();

        let blob0 = builder.build(b"hi", user, &relays).unwrap();

        let blob1 = match peeler.peel(&blob0, &keys[0]).unwrap() {
            Layer::Forward {
                next_hop,
                inner_blob,
            } => {
                assert_eq!(next_hop, relays[1].id);
                inner_blob
            }
            other => panic!("Expected Forward, got {:?}", other),
        };

        let blob2 = match peeler.peel(&blob1, &keys[1]).unwrap() {
            Layer::Forward {
                next_hop,
                inner_blob,
            } => {
                assert_eq!(next_hop, relays[2].id);
                inner_blob
            }
            other => panic!("Expected Forward, got {:?}", other),
        };

        assert_eq!(
            peeler.peel(&blob2, &keys[2]).unwrap(),
            Layer::Deliver {
                destination: user,
                plaintext: b"hi".to_vec(),
            }
        );
    }

    #[test]
    fn test_layer_sizes_grow_by_fixed_overhead() {
        let keys = relay_keys();
        let relays = descriptors(3);
        let peeler = RelayPeeler::default();
        let message = b"fixed-width wrapped keys";

        let mut blob = OnionBuilder::default()
            .build(message, DestinationId::new(1), &relays)
            .unwrap();
        assert_eq!(blob.len(), message.len() + 3 * LAYER_OVERHEAD);

        for (hop, key) in keys.iter().take(2).enumerate() {
            blob = match peeler.peel(&blob, key).unwrap() {
                Layer::Forward { inner_blob, .. } => inner_blob,
                other => panic!("Expected Forward, got {:?}", other),
            };
            assert_eq!(blob.len(), message.len() + (2 - hop) * LAYER_OVERHEAD);
        }
    }

    #[test]
    fn test_single_hop_delivers_directly() {
        let keys = relay_keys();
        let relays = descriptors(1);

        let blob = OnionBuilder::default()
            .build(b"", DestinationId::new(3), &relays)
            .unwrap();

        assert_eq!(
            RelayPeeler::default().peel(&blob, &keys[0]).unwrap(),
            Layer::Deliver {
                destination: DestinationId::new(3),
                plaintext: Vec::new(),
            }
        );
    }

    #[test]
    fn test_chacha_suite_roundtrip() {
        let keys = relay_keys();
        let relays = descriptors(2);
        let builder = OnionBuilder::new(SymmetricSuite::ChaCha20Poly1305);
        let peeler = RelayPeeler::new(SymmetricSuite::ChaCha20Poly1305);

        let blob = builder.build(b"chacha", DestinationId::new(2), &relays).unwrap();
        let inner = match peeler.peel(&blob, &keys[0]).unwrap() {
            Layer::Forward { inner_blob, .. } => inner_blob,
            other => panic!("Expected Forward, got {:?}", other),
        };
        assert!(peeler.peel(&inner, &keys[1]).unwrap().is_deliver());

        // A relay configured for the other suite cannot open the layer
        assert!(matches!(
            RelayPeeler::new(SymmetricSuite::Aes256Gcm).peel(&blob, &keys[0]),
            Err(OnionError::PayloadDecryptFailure)
        ));
    }

    #[test]
    fn test_empty_circuit_rejected() {
        assert!(matches!(
            OnionBuilder::default().build(b"x", DestinationId::new(1), &[]),
            Err(OnionError::EmptyCircuit)
        ));
    }

    #[test]
    fn test_duplicate_relay_rejected() {
        let relays = descriptors(2);
        let path = vec![relays[0].clone(), relays[1].clone(), relays[0].clone()];

        assert!(matches!(
            OnionBuilder::default().build(b"x", DestinationId::new(1), &path),
            Err(OnionError::DuplicateRelay(_))
        ));
    }

    #[test]
    fn test_build_for_circuit_uses_circuit_destination() {
        let keys = relay_keys();
        let circuit = Circuit::new(descriptors(1), DestinationId::new(44)).unwrap();

        let blob = OnionBuilder::default()
            .build_for_circuit(b"via circuit", &circuit)
            .unwrap();

        match RelayPeeler::default().peel(&blob, &keys[0]).unwrap() {
            Layer::Deliver { destination, .. } => assert_eq!(destination, DestinationId::new(44)),
            other => panic!("Expected Deliver, got {:?}", other),
        }
    }

    #[test]
    fn test_fresh_keys_per_build() {
        let relays = descriptors(2);
        let builder = OnionBuilder::default();

        let a = builder.build(b"same", DestinationId::new(1), &relays).unwrap();
        let b = builder.build(b"same", DestinationId::new(1), &relays).unwrap();

        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }
}
