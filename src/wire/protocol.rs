//! # WireProtocol - inbound frame classification.
//!
//! ```text
//! Frame::Text(t)   ──► log t, reply (text) {"response":"info","data":"Text message received"}
//! Frame::Binary(b) ──► parse JSON object
//!                        ├─ truthy "request" and truthy "data" ──► handler.process_message(msg)
//!                        └─ otherwise ──► reply {"response":"error","data":"Wrong message format"}
//! ```
//!
//! Truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::WireError;
use crate::wire::{Frame, Outbound};

/// Reply to every text frame.
pub const TEXT_ACK: &str = "Text message received";
/// Reply to malformed binary frames.
pub const WRONG_FORMAT: &str = "Wrong message format";

/// Application logic behind a WebSocket endpoint.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handles a well-formed message `{"request": .., "data": .., ..}`.
    ///
    /// The default echoes the message back as an `info` envelope.
    async fn process_message(&self, msg: Value, out: &Outbound) -> Result<(), WireError> {
        out.send(&Envelope::info(msg))
    }
}

/// Frame dispatcher shared by all connections of one endpoint.
#[derive(Clone)]
pub struct WireProtocol {
    handler: Arc<dyn MessageHandler>,
}

impl WireProtocol {
    pub fn new(handler: Arc<dyn MessageHandler>) -> Self {
        Self { handler }
    }

    /// Classifies one inbound frame and replies or dispatches.
    ///
    /// Malformed input never fails; only a gone peer does.
    pub async fn on_frame(&self, frame: Frame, out: &Outbound) -> Result<(), WireError> {
        match frame {
            Frame::Text(text) => {
                out.send_text(&Envelope::info(TEXT_ACK))?;
                tracing::info!(message = %text, "text message received");
                Ok(())
            }
            Frame::Binary(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(msg) if is_request(&msg) => self.handler.process_message(msg, out).await,
                _ => out.send(&Envelope::error(WRONG_FORMAT)),
            },
        }
    }
}

fn is_request(msg: &Value) -> bool {
    msg.get("request").is_some_and(truthy) && msg.get("data").is_some_and(truthy)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
