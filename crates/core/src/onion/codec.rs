//! Byte layout of a single onion layer.
//!
//! ```text
//! layer  = wrapped_key (modulus bytes) || iv (12) || aead_ciphertext
//! inner  = tag (1) || id (4, big-endian) || rest
//! ```
//!
//! The wrapped key has no length prefix: RSA-OAEP output is always exactly
//! the modulus width, so a relay splits at its own key size. A scheme with
//! variable-length output would need an explicit prefix here instead.

use super::error::OnionError;
use super::types::{Layer, OnionBlob};
use crate::crypto::IV_LEN;
use onionmsg_common::{DestinationId, RelayId, ID_LEN};

/// Inner layer carries a next hop and another onion
pub const TAG_FORWARD: u8 = 0x01;

/// Inner layer carries the destination and the plaintext
pub const TAG_DELIVER: u8 = 0x02;

/// Tag plus routing id
pub const INNER_HEADER_LEN: usize = 1 + ID_LEN;

/// Encoder/decoder for onion layers
pub struct LayerCodec;

impl LayerCodec {
    /// `wrapped_key || sym_ciphertext`
    pub fn encode_layer(wrapped_key: &[u8], sym_ciphertext: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(wrapped_key.len() + sym_ciphertext.len());
        out.extend_from_slice(wrapped_key);
        out.extend_from_slice(sym_ciphertext);
        out
    }

    /// Split a layer at the fixed wrapped-key width
    pub fn decode_layer(
        blob: &[u8],
        wrapped_key_width: usize,
    ) -> Result<(&[u8], &[u8]), OnionError> {
        if blob.len() <= wrapped_key_width {
            return Err(OnionError::malformed(format!(
                "layer of {} bytes is not longer than the {}-byte wrapped key",
                blob.len(),
                wrapped_key_width
            )));
        }
        Ok(blob.split_at(wrapped_key_width))
    }

    /// Split `iv || cipher_bytes`
    pub fn split_iv(sym_ciphertext: &[u8]) -> Result<(&[u8], &[u8]), OnionError> {
        if sym_ciphertext.len() <= IV_LEN {
            return Err(OnionError::malformed(format!(
                "symmetric section of {} bytes is not longer than the {}-byte iv",
                sym_ciphertext.len(),
                IV_LEN
            )));
        }
        Ok(sym_ciphertext.split_at(IV_LEN))
    }

    /// Frame a decrypted layer: tag, routing id, then the rest
    pub fn encode_inner(layer: &Layer) -> Vec<u8> {
        match layer {
            Layer::Forward {
                next_hop,
                inner_blob,
            } => Self::encode_forward(*next_hop, inner_blob.as_bytes()),
            Layer::Deliver {
                destination,
                plaintext,
            } => Self::encode_deliver(*destination, plaintext),
        }
    }

    pub fn encode_forward(next_hop: RelayId, inner_blob: &[u8]) -> Vec<u8> {
        frame(TAG_FORWARD, next_hop.to_bytes(), inner_blob)
    }

    pub fn encode_deliver(destination: DestinationId, plaintext: &[u8]) -> Vec<u8> {
        frame(TAG_DELIVER, destination.to_bytes(), plaintext)
    }

    /// Parse a decrypted layer
    pub fn decode_inner(inner: &[u8]) -> Result<Layer, OnionError> {
        if inner.len() < INNER_HEADER_LEN {
            return Err(OnionError::malformed(format!(
                "inner layer of {} bytes is shorter than its {}-byte header",
                inner.len(),
                INNER_HEADER_LEN
            )));
        }

        let (header, rest) = inner.split_at(INNER_HEADER_LEN);
        let id = &header[1..];

        match header[0] {
            TAG_FORWARD => {
                if rest.is_empty() {
                    return Err(OnionError::malformed("forward layer without inner onion"));
                }
                let next_hop =
                    RelayId::from_slice(id).map_err(|e| OnionError::malformed(e.to_string()))?;
                Ok(Layer::Forward {
                    next_hop,
                    inner_blob: OnionBlob::new(rest.to_vec()),
                })
            }
            TAG_DELIVER => {
                let destination = DestinationId::from_slice(id)
                    .map_err(|e| OnionError::malformed(e.to_string()))?;
                Ok(Layer::Deliver {
                    destination,
                    plaintext: rest.to_vec(),
                })
            }
            tag => Err(OnionError::malformed(format!("unknown layer tag {:#04x}", tag))),
        }
    }
}

fn frame(tag: u8, id: [u8; ID_LEN], rest: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(INNER_HEADER_LEN + rest.len());
    out.push(tag);
    out.extend_from_slice(&id);
    out.extend_from_slice(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_layer_splits_at_width() {
        let blob = LayerCodec::encode_layer(&[0xAA; 256], &[0xBB; 40]);
        let (wrapped, sym) = LayerCodec::decode_layer(&blob, 256).unwrap();

        assert_eq!(wrapped, &[0xAA; 256][..]);
        assert_eq!(sym, &[0xBB; 40][..]);
    }

    #[test]
    fn test_decode_layer_requires_body() {
        assert!(matches!(
            LayerCodec::decode_layer(&[0u8; 256], 256),
            Err(OnionError::MalformedLayer(_))
        ));
        assert!(LayerCodec::decode_layer(&[0u8; 10], 256).is_err());
        assert!(LayerCodec::decode_layer(&[0u8; 257], 256).is_ok());
    }

    #[test]
    fn test_split_iv() {
        let sym = [&[1u8; IV_LEN][..], &[2u8; 20][..]].concat();
        let (iv, body) = LayerCodec::split_iv(&sym).unwrap();
        assert_eq!(iv, &[1u8; IV_LEN]);
        assert_eq!(body, &[2u8; 20]);

        assert!(LayerCodec::split_iv(&[0u8; IV_LEN]).is_err());
    }

    #[test]
    fn test_inner_framing_layout() {
        let framed = LayerCodec::encode_inner(&Layer::Deliver {
            destination: DestinationId::new(258),
            plaintext: b"hi".to_vec(),
        });
        assert_eq!(framed, vec![TAG_DELIVER, 0, 0, 1, 2, b'h', b'i']);

        let framed = LayerCodec::encode_inner(&Layer::Forward {
            next_hop: RelayId::new(3),
            inner_blob: OnionBlob::new(vec![9, 9]),
        });
        assert_eq!(framed, vec![TAG_FORWARD, 0, 0, 0, 3, 9, 9]);
    }

    #[test]
    fn test_deliver_may_be_empty() {
        let layer = LayerCodec::decode_inner(&[TAG_DELIVER, 0, 0, 0, 7]).unwrap();
        assert_eq!(
            layer,
            Layer::Deliver {
                destination: DestinationId::new(7),
                plaintext: Vec::new(),
            }
        );
    }

    #[test]
    fn test_forward_requires_inner_onion() {
        assert!(matches!(
            LayerCodec::decode_inner(&[TAG_FORWARD, 0, 0, 0, 7]),
            Err(OnionError::MalformedLayer(_))
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!(
            LayerCodec::decode_inner(&[0x7F, 0, 0, 0, 1, 1, 2, 3]),
            Err(OnionError::MalformedLayer(_))
        ));
        assert!(LayerCodec::decode_inner(&[TAG_DELIVER, 0, 0]).is_err());
    }

    proptest! {
        #[test]
        fn decode_inner_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            match LayerCodec::decode_inner(&bytes) {
                Ok(layer) => {
                    prop_assert_eq!(LayerCodec::encode_inner(&layer), bytes);
                }
                Err(err) => {
                    prop_assert!(matches!(err, OnionError::MalformedLayer(_)));
                }
            }
        }

        #[test]
        fn decode_layer_partitions_blob(
            blob in proptest::collection::vec(any::<u8>(), 0..600),
            width in 1usize..520,
        ) {
            match LayerCodec::decode_layer(&blob, width) {
                Ok((wrapped, sym)) => {
                    prop_assert_eq!(wrapped.len(), width);
                    prop_assert!(!sym.is_empty());
                    prop_assert_eq!([wrapped, sym].concat(), blob.clone());
                }
                Err(_) => {
                    prop_assert!(blob.len() <= width);
                }
            }
        }
    }
}
