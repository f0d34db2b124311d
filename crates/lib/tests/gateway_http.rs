//! Integration tests: start the gateway on a free port and drive it over HTTP the way the
//! messaging bridge and an operator would. A small axum app stands in for the bridge API.
//! Server tasks are left running when each test ends.

use axum::{extract::State, routing::post, Json, Router};
use hydrobot::config::Config;
use hydrobot::gateway;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn temp_config_dir() -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("hydrobot-gateway-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let config_path = dir.join("config.json");
    (dir, config_path)
}

/// Config bound to loopback on a free port, pointing at `bridge_url`, with fast pacing.
fn test_config(bridge_url: String) -> Config {
    let mut config = Config::default();
    config.gateway.port = free_port();
    config.gateway.bind = "127.0.0.1".to_string();
    config.bridge.base_url = bridge_url;
    config.bridge.reconnect_delay_secs = 60;
    config.conversation.typing_delay_ms = 5;
    config.conversation.welcome_pause_ms = 5;
    config
}

/// Spawn the gateway and wait until `/health` answers. Returns the base URL.
async fn start_gateway(config: Config, config_path: PathBuf) -> String {
    let base = format!("http://127.0.0.1:{}", config.gateway.port);
    tokio::spawn(async move {
        let _ = gateway::run_gateway(config, config_path).await;
    });

    let client = reqwest::Client::new();
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(format!("{}/health", base)).send().await {
            Ok(resp) if resp.status().is_success() => {
                let json: serde_json::Value = resp.json().await.expect("parse JSON");
                assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("ok"));
                return base;
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "GET {}/health did not return 200 within 5s; last error: {:?}",
        base, last_err
    );
}

async fn post_event(base: &str, event: serde_json::Value) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("{}/bridge/events", base))
        .json(&event)
        .send()
        .await
        .expect("POST /bridge/events")
        .status()
}

async fn get_status(base: &str) -> serde_json::Value {
    reqwest::get(format!("{}/status", base))
        .await
        .expect("GET /status")
        .json()
        .await
        .expect("parse status JSON")
}

type Sent = Arc<Mutex<Vec<serde_json::Value>>>;

/// Fake bridge API recording `/send` bodies. Returns its base URL.
async fn start_fake_bridge(sent: Sent) -> String {
    async fn record(State(sent): State<Sent>, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
        sent.lock().unwrap().push(body);
        Json(serde_json::json!({ "ok": true }))
    }
    async fn ok() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "ok": true }))
    }
    let app = Router::new()
        .route("/send", post(record))
        .route("/typing", post(ok))
        .route("/initialize", post(ok))
        .with_state(sent);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake bridge");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn status_and_qr_follow_bridge_lifecycle() {
    let (dir, config_path) = temp_config_dir();
    let unreachable = format!("http://127.0.0.1:{}", free_port());
    let base = start_gateway(test_config(unreachable), config_path).await;

    let status = get_status(&base).await;
    assert_eq!(status["status"], "initializing");
    assert_eq!(status["hasQR"], false);

    let resp = reqwest::get(format!("{}/qr", base)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let code = post_event(&base, serde_json::json!({ "type": "qr", "data": "2@pairing-token" })).await;
    assert_eq!(code, reqwest::StatusCode::OK);
    let status = get_status(&base).await;
    assert_eq!(status["status"], "qr-received");
    assert_eq!(status["hasQR"], true);
    assert_eq!(
        std::fs::read_to_string(dir.join("state").join("last_qr.txt")).unwrap(),
        "2@pairing-token"
    );

    let page = reqwest::get(format!("{}/qr", base)).await.unwrap();
    assert!(page.status().is_success());
    let html = page.text().await.unwrap();
    assert!(html.contains("Escaneie o QR Code"));
    assert!(!html.contains("Último Salvo"));

    post_event(&base, serde_json::json!({ "type": "authenticated" })).await;
    let status = get_status(&base).await;
    assert_eq!(status["status"], "authenticated");
    assert_eq!(status["hasQR"], false);

    let html = reqwest::get(format!("{}/qr", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Último Salvo"));

    post_event(&base, serde_json::json!({ "type": "ready" })).await;
    assert_eq!(get_status(&base).await["status"], "ready");

    post_event(&base, serde_json::json!({ "type": "disconnected", "reason": "NAVIGATION" })).await;
    assert_eq!(get_status(&base).await["status"], "disconnected");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn restart_reports_bridge_failure_and_unknown_routes_404() {
    let (dir, config_path) = temp_config_dir();
    let unreachable = format!("http://127.0.0.1:{}", free_port());
    let base = start_gateway(test_config(unreachable), config_path).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{}/restart", base)).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));

    let resp = client.get(format!("{}/nope", base)).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().contains("Página não encontrada"));

    let index = client.get(format!("{}/", base)).send().await.unwrap();
    assert!(index.status().is_success());
    assert!(index.text().await.unwrap().contains("Status do Bot"));

    let code = post_event(&base, serde_json::json!({ "type": "bogus" })).await;
    assert_eq!(code, reqwest::StatusCode::BAD_REQUEST);
    let code = post_event(&base, serde_json::json!({ "type": "message", "body": "oi" })).await;
    assert_eq!(code, reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn bridge_events_require_the_shared_secret() {
    let (dir, config_path) = temp_config_dir();
    let mut config = test_config(format!("http://127.0.0.1:{}", free_port()));
    config.bridge.webhook_secret = Some("s3cret".to_string());
    let base = start_gateway(config, config_path).await;
    let client = reqwest::Client::new();

    let denied = client
        .post(format!("{}/bridge/events", base))
        .header(gateway::BRIDGE_SECRET_HEADER, "wrong")
        .json(&serde_json::json!({ "type": "ready" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), reqwest::StatusCode::FORBIDDEN);
    assert_eq!(get_status(&base).await["status"], "initializing");

    let accepted = client
        .post(format!("{}/bridge/events", base))
        .header(gateway::BRIDGE_SECRET_HEADER, "s3cret")
        .json(&serde_json::json!({ "type": "ready" }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), reqwest::StatusCode::OK);
    assert_eq!(get_status(&base).await["status"], "ready");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn first_message_gets_welcome_and_menu_through_the_bridge() {
    let (dir, config_path) = temp_config_dir();
    let sent: Sent = Arc::default();
    let bridge = start_fake_bridge(sent.clone()).await;
    let base = start_gateway(test_config(bridge), config_path).await;

    post_event(&base, serde_json::json!({ "type": "ready" })).await;
    let code = post_event(
        &base,
        serde_json::json!({
            "type": "message",
            "from": "5511999990000@c.us",
            "body": "oi",
            "pushName": "Maria da Silva"
        }),
    )
    .await;
    assert_eq!(code, reqwest::StatusCode::OK);
    // Group traffic is ignored entirely.
    post_event(
        &base,
        serde_json::json!({
            "type": "message",
            "from": "123-456@g.us",
            "body": "oi",
            "isGroup": true
        }),
    )
    .await;

    let mut bodies = Vec::new();
    for _ in 0..100 {
        bodies = sent.lock().unwrap().clone();
        if bodies.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(bodies.len(), 2, "expected welcome and menu, got {:?}", bodies);
    assert!(bodies.iter().all(|b| b["to"] == "5511999990000@c.us"));
    assert!(bodies[0]["body"].as_str().unwrap().contains("Olá, Maria!"));

    let resp = reqwest::Client::new()
        .post(format!("{}/restart", base))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Cliente reiniciado");
    assert!(json.get("error").map_or(true, |e| e.is_null()));

    let _ = std::fs::remove_dir_all(&dir);
}
