//! # WebSocket server over `tokio-tungstenite`.
//!
//! ```text
//! serve(listener, token)
//!   loop accept ──► connection task
//!                     ├─► accept_async (handshake)        "client connecting"
//!                     ├─► split: writer task ◄── Outbound  "connection open"
//!                     └─► reader: Text/Binary ──► WireProtocol::on_frame
//!                          └─ Close / error / token ──► Outbound::close, "connection closed: <reason>"
//! ```
//!
//! Connections are tracked; `serve` returns after the token fires and every
//! connection has finished.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::wire::{Frame, MessageHandler, Outbound, WireProtocol};

/// Named WebSocket endpoint serving one [`WireProtocol`].
pub struct WsServer {
    name: String,
    protocol: WireProtocol,
}

impl WsServer {
    pub fn new(name: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            name: name.into(),
            protocol: WireProtocol::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepts connections on `listener` until `shutdown` fires.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(server = %self.name, uri = %format!("ws://{addr}"), "websocket server listening");

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let protocol = self.protocol.clone();
                        let token = shutdown.clone();
                        let name = self.name.clone();
                        tracker.spawn(async move {
                            handle_connection(name, protocol, stream, peer, token).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(server = %self.name, error = %e, "accept failed");
                    }
                }
            }
        }

        tracker.close();
        tracker.wait().await;
        tracing::info!(server = %self.name, "websocket server stopped");
        Ok(())
    }
}

async fn handle_connection(
    name: String,
    protocol: WireProtocol,
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: CancellationToken,
) {
    tracing::info!(server = %name, %peer, "client connecting");
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(server = %name, %peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    tracing::info!(server = %name, %peer, "websocket connection open");

    let (mut sink, mut source) = ws.split();
    let (out, mut rx) = Outbound::channel();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let msg = match frame {
                Frame::Text(text) => Message::Text(text),
                Frame::Binary(bytes) => Message::Binary(bytes.to_vec()),
            };
            if sink.send(msg).await.is_err() {
                return;
            }
        }
        let _ = sink.close().await;
    });

    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break "server shutting down".to_string(),
            msg = source.next() => {
                let frame = match msg {
                    Some(Ok(Message::Text(text))) => Frame::Text(text),
                    Some(Ok(Message::Binary(data))) => Frame::Binary(Bytes::from(data)),
                    Some(Ok(Message::Close(_))) => break "Closed cleanly".to_string(),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => break e.to_string(),
                    None => break "connection dropped".to_string(),
                };
                if let Err(e) = protocol.on_frame(frame, &out).await {
                    break e.to_string();
                }
            }
        }
    };

    out.close();
    drop(out);
    let _ = writer.await;
    tracing::info!(server = %name, %peer, reason = %reason, "websocket connection closed");
}
