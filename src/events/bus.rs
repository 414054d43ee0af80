//! # Broadcast bus for lifecycle events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that publishing never blocks the
//! meta-event listener or an emission task.
//!
//! ```text
//! Publishers (many):                    Consumers:
//!   meta listener    ──┐
//!   emission task 1  ──┼──────► Bus ───► ObserverSet forwarder ──► observers
//!   emission task N  ──┤                (and any test receiver)
//!   ProcedureGateway ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One shared ring buffer; receivers that fall behind observe `RecvError::Lagged(n)`.
//! - A receiver sees only events sent after it subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable handle to the lifecycle event channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to every current receiver (fire-and-forget).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}
