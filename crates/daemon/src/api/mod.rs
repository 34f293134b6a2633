/// REST surface of the registry, relay and user nodes
///
/// Every role speaks JSON over HTTP; onions travel base64-encoded in the
/// `message` field.

pub mod error;
pub mod responses;
pub mod server;

pub use error::AppError;
pub use responses::*;
pub use server::{socket_addr, ApiServer};
