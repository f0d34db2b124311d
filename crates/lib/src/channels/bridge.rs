//! Messaging bridge channel: events arrive as webhook POSTs, sends go out via the bridge HTTP API.

use crate::channels::inbound::InboundMessage;
use crate::channels::transport::{Transport, TransportError};
use crate::connectivity::{Connectivity, LifecycleEvent};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Event posted by the bridge to `POST /bridge/events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeEvent {
    Qr {
        data: String,
    },
    Authenticated,
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Message(BridgeMessage),
}

impl BridgeEvent {
    /// Connectivity part of the event; `None` for chat messages.
    pub fn lifecycle(&self) -> Option<LifecycleEvent> {
        match self {
            BridgeEvent::Qr { data } => Some(LifecycleEvent::PairingArtifact(data.clone())),
            BridgeEvent::Authenticated => Some(LifecycleEvent::Authenticated),
            BridgeEvent::Ready => Some(LifecycleEvent::Ready),
            BridgeEvent::Disconnected { reason } => {
                Some(LifecycleEvent::Disconnected(reason.clone()))
            }
            BridgeEvent::Message(_) => None,
        }
    }
}

/// Chat message payload as the bridge reports it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub push_name: Option<String>,
}

impl BridgeMessage {
    /// Convert to an engine message; `None` when the sender or body is missing.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let sender_id = self.from.filter(|f| !f.trim().is_empty())?;
        let body = self.body?;
        Some(InboundMessage {
            sender_id,
            body,
            is_group: self.is_group,
            author: self.author,
            display_name: self.push_name.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Bridge connector: refuses sends unless the client reported `ready`.
pub struct BridgeChannel {
    id: String,
    base_url: String,
    client: reqwest::Client,
    connectivity: Arc<Connectivity>,
}

impl BridgeChannel {
    pub fn new(base_url: impl Into<String>, connectivity: Arc<Connectivity>) -> Self {
        Self {
            id: "bridge".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            connectivity,
        }
    }

    async fn ensure_ready(&self) -> Result<(), TransportError> {
        let phase = self.connectivity.phase().await;
        if phase == crate::connectivity::ConnectivityPhase::Ready {
            Ok(())
        } else {
            Err(TransportError::Unavailable(phase))
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Delivery(format!(
                "{} failed: {} {}",
                path, status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for BridgeChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<(), TransportError> {
        self.ensure_ready().await?;
        self.post("/send", serde_json::json!({ "to": to, "body": text }))
            .await
    }

    async fn send_typing(&self, to: &str) -> Result<(), TransportError> {
        self.ensure_ready().await?;
        self.post("/typing", serde_json::json!({ "to": to })).await
    }

    async fn initialize(&self) -> Result<(), TransportError> {
        log::info!("bridge: initializing messaging client");
        self.post("/initialize", serde_json::json!({})).await
    }
}
