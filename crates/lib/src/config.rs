//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.hydrobot/config.json`) and environment.
//! Every field has a default so a missing file still yields a runnable bot.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP status/QR server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging bridge (transport) settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Menu bot behavior: escalation contacts and pacing.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Where the last pairing artifact is kept (default ~/.hydrobot/state).
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP and WebSocket (default 8080). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Messaging bridge: the external process that owns the chat client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Base URL for outbound calls (`/send`, `/typing`, `/initialize`).
    #[serde(default = "default_bridge_base_url")]
    pub base_url: String,

    /// Shared secret expected in `X-Bridge-Secret` on event POSTs. Overridden by HYDROBOT_BRIDGE_SECRET env.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Seconds to wait after a disconnect before re-initializing the transport.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_bridge_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_base_url(),
            webhook_secret: None,
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

/// Conversation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationConfig {
    /// Transport ids notified, in order, when a customer picks "other matters".
    #[serde(default = "default_support_contacts")]
    pub support_contacts: Vec<String>,

    /// How long a conversation stays paused before the bot takes it back.
    #[serde(default = "default_pause_minutes")]
    pub pause_minutes: u64,

    /// Typing indicator duration before the menu is sent.
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,

    /// Gap between the welcome text and the menu.
    #[serde(default = "default_welcome_pause_ms")]
    pub welcome_pause_ms: u64,

    /// Fixed UTC offset used to render the release time. Process local time when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Company name shown in the welcome message.
    #[serde(default = "default_company_name")]
    pub company_name: String,
}

fn default_support_contacts() -> Vec<String> {
    vec![
        "553190843766@c.us".to_string(),
        "553171453481@c.us".to_string(),
    ]
}

fn default_pause_minutes() -> u64 {
    30
}

fn default_typing_delay_ms() -> u64 {
    1000
}

fn default_welcome_pause_ms() -> u64 {
    1500
}

fn default_company_name() -> String {
    "Hidrocontrol".to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            support_contacts: default_support_contacts(),
            pause_minutes: default_pause_minutes(),
            typing_delay_ms: default_typing_delay_ms(),
            welcome_pause_ms: default_welcome_pause_ms(),
            utc_offset_minutes: None,
            company_name: default_company_name(),
        }
    }
}

impl ConversationConfig {
    pub fn pause_duration(&self) -> Duration {
        Duration::from_secs(self.pause_minutes.saturating_mul(60))
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn welcome_pause(&self) -> Duration {
        Duration::from_millis(self.welcome_pause_ms)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the gateway port: env PORT overrides config.
pub fn resolve_gateway_port(config: &Config) -> u16 {
    non_empty_env("PORT")
        .and_then(|p| p.parse().ok())
        .unwrap_or(config.gateway.port)
}

/// Resolve the bridge webhook secret: env HYDROBOT_BRIDGE_SECRET overrides config.
pub fn resolve_bridge_secret(config: &Config) -> Option<String> {
    non_empty_env("HYDROBOT_BRIDGE_SECRET").or_else(|| {
        config
            .bridge
            .webhook_secret
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("HYDROBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".hydrobot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Resolve the state directory: `stateDir` if set (relative paths resolved against the
/// config file's parent), otherwise the `state` subdirectory next to the config file.
pub fn resolve_state_dir(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.state_dir {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                config_parent.join(d)
            }
        }
        _ => config_parent.join("state"),
    }
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_runnable() {
        let c = Config::default();
        assert_eq!(c.gateway.port, 8080);
        assert_eq!(c.gateway.bind, "0.0.0.0");
        assert_eq!(c.conversation.support_contacts.len(), 2);
        assert_eq!(c.conversation.pause_duration(), Duration::from_secs(30 * 60));
        assert_eq!(c.conversation.typing_delay(), Duration::from_millis(1000));
        assert_eq!(c.conversation.welcome_pause(), Duration::from_millis(1500));
        assert_eq!(c.bridge.reconnect_delay_secs, 5);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: Config = serde_json::from_str(
            r#"{"conversation":{"supportContacts":["1@c.us"],"pauseMinutes":10}}"#,
        )
        .unwrap();
        assert_eq!(c.conversation.support_contacts, vec!["1@c.us".to_string()]);
        assert_eq!(c.conversation.pause_minutes, 10);
        assert_eq!(c.conversation.welcome_pause_ms, 1500);
        assert_eq!(c.gateway.port, 8080);
    }

    #[test]
    fn huge_pause_minutes_saturates() {
        let c: ConversationConfig =
            serde_json::from_str(&format!(r#"{{"pauseMinutes":{}}}"#, u64::MAX)).unwrap();
        assert_eq!(c.pause_duration(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn resolve_state_dir_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.hydrobot/config.json");
        assert_eq!(
            resolve_state_dir(&config, path),
            PathBuf::from("/home/user/.hydrobot/state")
        );
    }

    #[test]
    fn resolve_state_dir_override_relative() {
        let config = Config {
            state_dir: Some(PathBuf::from("data")),
            ..Config::default()
        };
        let path = Path::new("/srv/bot/config.json");
        assert_eq!(
            resolve_state_dir(&config, path),
            PathBuf::from("/srv/bot/data")
        );
    }

    #[test]
    fn resolve_state_dir_override_absolute() {
        let config = Config {
            state_dir: Some(PathBuf::from("/data/wwebjs")),
            ..Config::default()
        };
        let path = Path::new("/srv/bot/config.json");
        assert_eq!(
            resolve_state_dir(&config, path),
            PathBuf::from("/data/wwebjs")
        );
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let path = std::env::temp_dir()
            .join(format!("hydrobot-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 8080);
    }
}
