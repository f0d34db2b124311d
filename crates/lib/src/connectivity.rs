//! Connectivity status of the messaging transport.
//!
//! Written only from transport lifecycle events; read by the bridge (to refuse sends while
//! not ready) and by the HTTP status surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;

/// Lifecycle phase of the messaging client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectivityPhase {
    #[default]
    Initializing,
    /// A pairing artifact (login QR) is waiting to be scanned.
    QrReceived,
    Authenticated,
    Ready,
    Disconnected,
}

impl ConnectivityPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityPhase::Initializing => "initializing",
            ConnectivityPhase::QrReceived => "qr-received",
            ConnectivityPhase::Authenticated => "authenticated",
            ConnectivityPhase::Ready => "ready",
            ConnectivityPhase::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectivityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    PairingArtifact(String),
    Authenticated,
    Ready,
    Disconnected(String),
}

/// Read-only view returned by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: ConnectivityPhase,
    #[serde(rename = "hasQR")]
    pub has_qr: bool,
}

#[derive(Debug, Default)]
struct Inner {
    phase: ConnectivityPhase,
    pairing_artifact: Option<String>,
}

/// Current phase plus the pending pairing artifact, if any.
#[derive(Debug, Default)]
pub struct Connectivity {
    inner: RwLock<Inner>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a lifecycle event and return the resulting status.
    pub async fn apply(&self, event: &LifecycleEvent) -> StatusReport {
        let mut g = self.inner.write().await;
        match event {
            LifecycleEvent::PairingArtifact(data) => {
                g.phase = ConnectivityPhase::QrReceived;
                g.pairing_artifact = Some(data.clone());
            }
            LifecycleEvent::Authenticated => {
                g.phase = ConnectivityPhase::Authenticated;
                g.pairing_artifact = None;
            }
            LifecycleEvent::Ready => {
                g.phase = ConnectivityPhase::Ready;
            }
            LifecycleEvent::Disconnected(_) => {
                g.phase = ConnectivityPhase::Disconnected;
            }
        }
        StatusReport {
            status: g.phase,
            has_qr: g.pairing_artifact.is_some(),
        }
    }

    pub async fn phase(&self) -> ConnectivityPhase {
        self.inner.read().await.phase
    }

    pub async fn is_ready(&self) -> bool {
        self.phase().await == ConnectivityPhase::Ready
    }

    pub async fn status(&self) -> StatusReport {
        let g = self.inner.read().await;
        StatusReport {
            status: g.phase,
            has_qr: g.pairing_artifact.is_some(),
        }
    }

    pub async fn pairing_artifact(&self) -> Option<String> {
        self.inner.read().await.pairing_artifact.clone()
    }
}
