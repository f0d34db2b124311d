//! Gateway wire types: HTTP response bodies and WebSocket event frames.

use crate::connectivity::StatusReport;
use crate::conversation::SessionEvent;
use serde::{Deserialize, Serialize};

/// Body of `POST /restart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RestartResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Event frame: `{ "type": "event", "event", "payload" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEvent {
    #[serde(rename = "type")]
    pub typ: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WsEvent {
    fn new(event: &str, payload: serde_json::Value) -> Self {
        Self {
            typ: "event".to_string(),
            event: event.to_string(),
            payload,
        }
    }

    pub fn connectivity(status: &StatusReport) -> Self {
        Self::new(
            "connectivity",
            serde_json::to_value(status).unwrap_or_default(),
        )
    }

    pub fn session_state(event: &SessionEvent) -> Self {
        Self::new(
            "session.state",
            serde_json::to_value(event).unwrap_or_default(),
        )
    }

    pub fn shutdown() -> Self {
        Self::new("shutdown", serde_json::json!({}))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
