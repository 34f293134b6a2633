//! The onion protocol core: circuit selection, layered construction and
//! single-layer peeling.
//!
//! Everything here is synchronous and holds no state between messages.

mod builder;
mod codec;
mod error;
mod peeler;
mod selector;
mod types;

pub use builder::OnionBuilder;
pub use codec::{LayerCodec, INNER_HEADER_LEN, TAG_DELIVER, TAG_FORWARD};
pub use error::OnionError;
pub use peeler::RelayPeeler;
pub use selector::{CircuitSelector, SelectionCriteria};
pub use types::{Circuit, Layer, OnionBlob, PeelResult, RelayDescriptor};
