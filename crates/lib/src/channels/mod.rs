//! Messaging transport.
//!
//! The chat client runs in an external bridge process. Inbound events reach the gateway over
//! HTTP and are handed to the conversation engine; outbound sends go back through the
//! [`Transport`] trait.

mod bridge;
mod inbound;
mod transport;

pub use bridge::{BridgeChannel, BridgeEvent, BridgeMessage};
pub use inbound::InboundMessage;
pub use transport::{Transport, TransportError};
