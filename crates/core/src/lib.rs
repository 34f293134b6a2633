pub mod crypto;
pub mod directory;
pub mod onion;

pub use crypto::{CryptoError, LayerCipher, RelayKeyPair, RelayPublicKey, SessionKey};
pub use directory::{Directory, DirectoryError, MemoryDirectory};
pub use onion::{
    Circuit, CircuitSelector, Layer, LayerCodec, OnionBlob, OnionBuilder, OnionError,
    PeelResult, RelayDescriptor, RelayPeeler, SelectionCriteria,
};

pub use onionmsg_common::{DestinationId, RelayId, SymmetricSuite};
