use async_trait::async_trait;

use crate::errors::RelayError;

/// One request, one reply: the raw channel between a monitor engine and the
/// relay. Implementations adapt whatever notification channel the host
/// provides; a reply is either the relay's JSON answer or a transport failure.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, message: serde_json::Value) -> Result<serde_json::Value, RelayError>;
}
