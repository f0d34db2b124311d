//! Gateway: HTTP + WebSocket status surface and bridge webhook.
//!
//! Single port serves the status and QR pages, `/restart`, `/health`, the bridge event
//! webhook, and a read-only WebSocket event stream.

mod pages;
mod pairing;
mod protocol;
mod server;

pub use pairing::PairingStore;
pub use protocol::{RestartResult, WsEvent};
pub use server::{build_router, run_gateway, GatewayState, BRIDGE_SECRET_HEADER};
