/// onionmsg daemon library
///
/// HTTP glue around the onion core: the relay registry, relay nodes that
/// peel and forward, and user nodes that build onions and receive
/// plaintext.

pub mod api;
pub mod network;
pub mod registry;
pub mod relay;
pub mod transport;
pub mod user;

pub use api::{ApiServer, AppError};
pub use relay::RelayNode;
pub use transport::{HttpTransport, RegistryClient, RelaySource, Transport};
pub use user::UserNode;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::transport::Transport;
    use async_trait::async_trait;
    use axum::body::{Body, Bytes};
    use axum::http::{header, Request};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use onionmsg_common::OnionMsgError;
    use onionmsg_core::{
        DestinationId, Directory, MemoryDirectory, OnionBlob, RelayDescriptor, RelayId,
        RelayKeyPair,
    };
    use serde::de::DeserializeOwned;
    use std::sync::OnceLock;
    use tokio::sync::Mutex;

    /// RSA generation is slow, so every test shares the same four keys
    pub fn keys() -> &'static [RelayKeyPair] {
        static KEYS: OnceLock<Vec<RelayKeyPair>> = OnceLock::new();
        KEYS.get_or_init(|| {
            (0..4)
                .map(|_| RelayKeyPair::generate().expect("key generation"))
                .collect()
        })
    }

    /// Relays 1..=n backed by the shared keys
    pub fn descriptors(n: usize) -> Vec<RelayDescriptor> {
        keys()
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, k)| RelayDescriptor::new(RelayId::new(i as u32 + 1), k.public_key().clone()))
            .collect()
    }

    pub fn directory(n: usize) -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        for relay in descriptors(n) {
            directory.register(relay.id, relay.public_key).unwrap();
        }
        directory
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn json_body<T: DeserializeOwned>(response: Response) -> T {
        let bytes: Bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Relay(RelayId, OnionBlob),
        User(DestinationId, Vec<u8>),
    }

    /// Transport that remembers what it was asked to send
    #[derive(Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<Sent>>,
        fail: bool,
    }

    impl RecordingTransport {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub async fn sent(&self) -> Vec<Sent> {
            self.sent.lock().await.clone()
        }

        async fn push(&self, sent: Sent) -> Result<(), OnionMsgError> {
            if self.fail {
                return Err(OnionMsgError::network("connection refused"));
            }
            self.sent.lock().await.push(sent);
            Ok(())
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_to_relay(
            &self,
            relay: RelayId,
            blob: &OnionBlob,
        ) -> Result<(), OnionMsgError> {
            self.push(Sent::Relay(relay, blob.clone())).await
        }

        async fn deliver(
            &self,
            destination: DestinationId,
            plaintext: &[u8],
        ) -> Result<(), OnionMsgError> {
            self.push(Sent::User(destination, plaintext.to_vec())).await
        }
    }
}
