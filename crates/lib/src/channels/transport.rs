//! Transport seam: what the conversation engine needs from the messaging client.

use crate::connectivity::ConnectivityPhase;
use async_trait::async_trait;

/// Why an outbound action did not happen.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport not ready (phase: {0})")]
    Unavailable(ConnectivityPhase),
    #[error("bridge request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Handle to the messaging transport (send, presence, re-initialize).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport id (e.g. "bridge").
    fn id(&self) -> &str;
    /// Send a text message to a chat.
    async fn send_message(&self, to: &str, text: &str) -> Result<(), TransportError>;
    /// Show the "typing..." presence in a chat.
    async fn send_typing(&self, to: &str) -> Result<(), TransportError>;
    /// (Re)start the underlying client; pairing and readiness arrive later as lifecycle events.
    async fn initialize(&self) -> Result<(), TransportError>;
}
