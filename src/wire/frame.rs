//! Frames and the outbound half of a connection.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::envelope::Envelope;
use crate::error::WireError;

/// One WebSocket data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text-mode frame (UTF-8).
    Text(String),
    /// Binary-mode frame.
    Binary(Bytes),
}

impl Frame {
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }

    /// Decodes the frame payload as an envelope (test and client helper).
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Frame::Text(t) => serde_json::from_str(t).ok(),
            Frame::Binary(b) => serde_json::from_slice(b).ok(),
        }
    }
}

/// Sending side of one peer connection.
///
/// Envelopes are serialized to JSON and queued for the connection's writer
/// task; binary mode is the default. Clones share one close signal, fired by
/// the connection when the peer goes away.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Frame>,
    closed: CancellationToken,
}

impl Outbound {
    pub fn new(tx: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            tx,
            closed: CancellationToken::new(),
        }
    }

    /// Creates an outbound handle and the receiver its frames arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Sends `envelope` as a binary frame.
    pub fn send(&self, envelope: &Envelope) -> Result<(), WireError> {
        let bytes = serde_json::to_vec(envelope).map_err(WireError::Encode)?;
        self.push(Frame::Binary(Bytes::from(bytes)))
    }

    /// Sends `envelope` as a text frame.
    pub fn send_text(&self, envelope: &Envelope) -> Result<(), WireError> {
        let text = serde_json::to_string(envelope).map_err(WireError::Encode)?;
        self.push(Frame::Text(text))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    /// Marks the connection as gone; later sends fail with [`WireError::Closed`].
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Completes once [`close`](Self::close) was called or the writer is gone.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.closed.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }

    fn push(&self, frame: Frame) -> Result<(), WireError> {
        if self.closed.is_cancelled() {
            return Err(WireError::Closed);
        }
        self.tx.send(frame).map_err(|_| WireError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_send_is_binary() {
        let (out, mut rx) = Outbound::channel();
        out.send(&Envelope::data(1)).expect("send");
        out.send_text(&Envelope::info("hi")).expect("send");

        let first = rx.try_recv().expect("binary");
        assert!(first.is_binary());
        assert_eq!(first.envelope(), Some(Envelope::data(1)));

        let second = rx.try_recv().expect("text");
        assert_eq!(
            second,
            Frame::Text(r#"{"response":"info","data":"hi"}"#.to_string())
        );
    }

    #[test]
    fn send_after_peer_left_fails() {
        let (out, rx) = Outbound::channel();
        drop(rx);
        assert!(out.is_closed());
        assert!(matches!(out.send(&Envelope::data(1)), Err(WireError::Closed)));
    }

    #[tokio::test]
    async fn close_is_seen_by_every_clone() {
        let (out, _rx) = Outbound::channel();
        let other = out.clone();

        out.close();
        other.closed().await;
        assert!(other.is_closed());
        assert!(matches!(other.send_text(&Envelope::info("x")), Err(WireError::Closed)));
    }
}
