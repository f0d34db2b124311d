use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser)]
#[command(name = "hydrobot")]
#[command(about = "Hydrobot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory, a default config, and the state directory.
    Init {
        /// Config file path (default: HYDROBOT_CONFIG_PATH or ~/.hydrobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the support bot: conversation engine, bridge webhook, and status gateway.
    Run {
        /// Config file path (default: HYDROBOT_CONFIG_PATH or ~/.hydrobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT env, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the connectivity status of a running gateway.
    Status {
        /// Config file path (default: HYDROBOT_CONFIG_PATH or ~/.hydrobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Stream gateway events (connectivity and session changes) until interrupted.
    Watch {
        /// Config file path (default: HYDROBOT_CONFIG_PATH or ~/.hydrobot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("hydrobot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Status { config }) => {
            if let Err(e) = run_status(config).await {
                log::error!("status failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Watch { config }) => {
            if let Err(e) = run_watch(config).await {
                log::error!("watch failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(hydrobot::config::default_config_path);
    let dir = hydrobot::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = hydrobot::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting hydrobot on {}:{}",
        config.gateway.bind,
        hydrobot::config::resolve_gateway_port(&config)
    );
    hydrobot::gateway::run_gateway(config, path).await
}

/// Host:port to reach the local gateway; a wildcard bind is reached via loopback.
fn gateway_authority(config: &hydrobot::config::Config) -> String {
    let bind = config.gateway.bind.trim();
    let host = if bind.is_empty() || bind == "0.0.0.0" {
        "127.0.0.1"
    } else {
        bind
    };
    format!("{}:{}", host, hydrobot::config::resolve_gateway_port(config))
}

async fn run_status(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _) = hydrobot::config::load_config(config_path)?;
    let url = format!("http://{}/status", gateway_authority(&config));
    let resp = reqwest::get(&url).await?;
    if !resp.status().is_success() {
        anyhow::bail!("GET {} returned {}", url, resp.status());
    }
    let status: serde_json::Value = resp.json().await?;
    let phase = status
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let has_qr = status
        .get("hasQR")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    println!("status: {}", phase);
    if has_qr {
        println!("pairing QR available at http://{}/qr", gateway_authority(&config));
    }
    Ok(())
}

async fn run_watch(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _) = hydrobot::config::load_config(config_path)?;
    let ws_url = format!("ws://{}/ws", gateway_authority(&config));
    let (mut ws, _) = tokio_tungstenite::connect_async(&ws_url).await?;
    log::info!("connected to {}", ws_url);

    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg? else { continue };
        let frame: serde_json::Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) => {
                println!("{}", text);
                continue;
            }
        };
        let event = frame.get("event").and_then(|v| v.as_str()).unwrap_or("?");
        let payload = frame
            .get("payload")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        println!("{} {}", event, payload);
        if event == "shutdown" {
            break;
        }
    }
    Ok(())
}
