//! # WebSocket wire protocol.
//!
//! - [`Frame`] / [`Outbound`]: one message and the sending half of a peer.
//! - [`WireProtocol`]: classifies inbound frames and enforces the
//!   `{"request", "data"}` shape before calling a [`MessageHandler`].
//! - [`BrokerBridge`]: handler forwarding requests to broker procedures and,
//!   optionally, subscribing peers to topics.
//! - `WsServer` (feature `ws`): serves a protocol over `tokio-tungstenite`.

mod bridge;
mod frame;
mod protocol;
#[cfg(feature = "ws")]
mod server;

pub use bridge::{BrokerBridge, SUBSCRIBE_REQUEST, TOPIC_USAGE};
pub use frame::{Frame, Outbound};
pub use protocol::{MessageHandler, WireProtocol, TEXT_ACK, WRONG_FORMAT};
#[cfg(feature = "ws")]
pub use server::WsServer;
