//! Gateway HTTP + WebSocket server (single port).
//!
//! Serves the status/QR pages, the restart endpoint, the bridge event webhook, and a
//! read-only WebSocket event stream.

use crate::channels::{BridgeChannel, BridgeEvent, InboundMessage, Transport};
use crate::config::{self, Config};
use crate::connectivity::{Connectivity, LifecycleEvent, StatusReport};
use crate::conversation::{
    rules, spawn_dispatcher, ConversationEngine, InMemorySessionStore, TokioScheduler,
};
use crate::gateway::pages;
use crate::gateway::pairing::PairingStore;
use crate::gateway::protocol::{RestartResult, WsEvent};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Header carrying the shared secret on bridge event POSTs.
pub const BRIDGE_SECRET_HEADER: &str = "X-Bridge-Secret";

const RESTART_OK_MESSAGE: &str = "Cliente reiniciado";

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Port actually bound (config or PORT env).
    pub port: u16,
    pub connectivity: Arc<Connectivity>,
    pub transport: Arc<dyn Transport>,
    pub engine: ConversationEngine,
    pub pairing_store: Arc<PairingStore>,
    /// When Some, bridge event POSTs must carry this in `X-Bridge-Secret`.
    pub bridge_secret: Option<String>,
    /// Broadcasts JSON event frames to WebSocket clients.
    pub event_tx: broadcast::Sender<String>,
    /// Inbound chat messages for the dispatcher.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
}

/// Routes for the given state.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(index_http))
        .route("/status", get(status_http))
        .route("/qr", get(qr_http))
        .route("/restart", post(restart_http))
        .route("/health", get(health_http))
        .route("/bridge/events", post(bridge_events))
        .route("/ws", get(ws_handler))
        .fallback(not_found)
        .with_state(state)
}

/// Run the gateway; binds to config.gateway.bind and the resolved port.
/// Starts the inbound dispatcher, asks the bridge to initialize the messaging client,
/// and blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let port = config::resolve_gateway_port(&config);
    let bind = config.gateway.bind.trim().to_string();
    let state_dir = config::resolve_state_dir(&config, &config_path);
    let pairing_store = Arc::new(PairingStore::in_dir(&state_dir));
    log::debug!("pairing artifact file: {}", pairing_store.path().display());

    let connectivity = Arc::new(Connectivity::new());
    let transport: Arc<dyn Transport> = Arc::new(BridgeChannel::new(
        config.bridge.base_url.clone(),
        connectivity.clone(),
    ));
    let engine = ConversationEngine::new(
        Arc::new(InMemorySessionStore::new()),
        transport.clone(),
        Arc::new(TokioScheduler::new()),
        config.conversation.clone(),
    );
    log::info!(
        "conversation engine ready: transport {} at {}, {} support contact(s), {} minute pause",
        transport.id(),
        config.bridge.base_url,
        config.conversation.support_contacts.len(),
        config.conversation.pause_minutes
    );
    log::debug!("rule order: {}", rules::rule_names().join(", "));

    let (event_tx, _) = broadcast::channel(64);
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(64);
    spawn_dispatcher(engine.clone(), inbound_rx);
    forward_session_events(&engine, event_tx.clone());

    let state = GatewayState {
        bridge_secret: config::resolve_bridge_secret(&config),
        config: Arc::new(config),
        port,
        connectivity,
        transport: transport.clone(),
        engine,
        pairing_store,
        event_tx: event_tx.clone(),
        inbound_tx,
    };

    tokio::spawn(async move {
        if let Err(e) = transport.initialize().await {
            log::warn!("initial transport initialization failed: {}", e);
        }
    });

    let app = build_router(state);
    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(event_tx))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Relay engine state changes to WebSocket clients.
fn forward_session_events(engine: &ConversationEngine, event_tx: broadcast::Sender<String>) {
    let mut rx = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _ = event_tx.send(WsEvent::session_state(&event).to_json());
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::debug!("session event relay lagged {} event(s)", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Pending pause timers are dropped with the runtime.
async fn shutdown_signal(event_tx: broadcast::Sender<String>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, closing gateway");
    let _ = event_tx.send(WsEvent::shutdown().to_json());
}

/// Record a lifecycle event, persist a new pairing artifact, and schedule a
/// re-initialization after a disconnect.
async fn apply_lifecycle(state: &GatewayState, event: LifecycleEvent) {
    let status = state.connectivity.apply(&event).await;
    match &event {
        LifecycleEvent::PairingArtifact(data) => {
            log::info!("pairing QR received; scan it at /qr");
            if let Err(e) = state.pairing_store.save(data).await {
                log::warn!("saving pairing QR failed: {}", e);
            }
        }
        LifecycleEvent::Authenticated => log::info!("messaging client authenticated"),
        LifecycleEvent::Ready => log::info!("messaging client ready"),
        LifecycleEvent::Disconnected(reason) => {
            log::warn!("messaging client disconnected: {}", reason);
            schedule_reinitialize(state);
        }
    }
    let _ = state.event_tx.send(WsEvent::connectivity(&status).to_json());
}

fn schedule_reinitialize(state: &GatewayState) {
    let transport = state.transport.clone();
    let delay = Duration::from_secs(state.config.bridge.reconnect_delay_secs);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        log::info!("re-initializing messaging client after disconnect");
        if let Err(e) = transport.initialize().await {
            log::warn!("re-initialization failed: {}", e);
        }
    });
}

/// POST /bridge/events: lifecycle and message events from the messaging bridge.
async fn bridge_events(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.bridge_secret {
        let provided = headers
            .get(BRIDGE_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let event: BridgeEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("bridge: unparseable event: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    if let Some(lifecycle) = event.lifecycle() {
        apply_lifecycle(&state, lifecycle).await;
        return StatusCode::OK;
    }
    let BridgeEvent::Message(message) = event else {
        return StatusCode::OK;
    };
    let Some(inbound) = message.into_inbound() else {
        log::warn!("bridge: dropping message event without sender or body");
        return StatusCode::UNPROCESSABLE_ENTITY;
    };
    if state.inbound_tx.send(inbound).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET /: HTML status page.
async fn index_http(State(state): State<GatewayState>) -> Html<String> {
    Html(pages::index_html(state.port))
}

/// GET /status: connectivity phase and whether a QR is available.
async fn status_http(State(state): State<GatewayState>) -> Json<StatusReport> {
    Json(state.connectivity.status().await)
}

/// GET /qr: current pairing QR, else the last saved one, else 404.
async fn qr_http(State(state): State<GatewayState>) -> Response {
    if let Some(artifact) = state.connectivity.pairing_artifact().await {
        return Html(pages::qr_html(&artifact, false)).into_response();
    }
    if let Some(artifact) = state.pairing_store.load_last().await {
        return Html(pages::qr_html(&artifact, true)).into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "QR code não disponível" })),
    )
        .into_response()
}

/// POST /restart: ask the bridge to re-initialize the messaging client.
async fn restart_http(State(state): State<GatewayState>) -> (StatusCode, Json<RestartResult>) {
    match state.transport.initialize().await {
        Ok(()) => {
            log::info!("transport restart requested");
            (StatusCode::OK, Json(RestartResult::ok(RESTART_OK_MESSAGE)))
        }
        Err(e) => {
            log::warn!("transport restart failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RestartResult::failed(e.to_string())),
            )
        }
    }
}

/// GET /health: liveness probe.
async fn health_http() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found(uri: Uri) -> (StatusCode, Html<&'static str>) {
    log::info!("route not found: {}", uri);
    (StatusCode::NOT_FOUND, Html(pages::not_found_html()))
}

/// GET /ws upgrades to a read-only event stream; the first frame is the current status.
async fn ws_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState) {
    let client_id = uuid::Uuid::new_v4();
    log::debug!("ws client {} connected", client_id);
    let mut event_rx = state.event_tx.subscribe();

    let hello = WsEvent::connectivity(&state.connectivity.status().await).to_json();
    if socket.send(Message::Text(hello)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::debug!("ws client {} lagged {} event(s)", client_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    log::debug!("ws client {} disconnected", client_id);
}
