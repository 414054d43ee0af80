//! # Non-blocking event fan-out to multiple observers.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► observer1.on_event()
//!     │    (bounded)         └──────► panic → ObserverPanicked
//!     └──► [queue N] ──► worker N ──► observerN.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` uses `try_send` and returns immediately
//! - **Per-observer FIFO**, no ordering across observers
//! - **Overflow**: event dropped for that observer only, `ObserverOverflow` published
//! - **Isolation**: a panicking observer keeps its worker alive
//!
//! `AssertUnwindSafe` is used around observer futures; an observer that panics
//! while holding a lock may leave its own state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::observers::Observer;

struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator: one bounded queue and one worker per observer.
pub struct ObserverSet {
    channels: Vec<ObserverChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl ObserverSet {
    /// Creates the set and spawns one worker task per observer.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observer>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(observers.len());
        let mut workers = Vec::with_capacity(observers.len());

        for obs in observers {
            let name = obs.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(obs.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = obs.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let any = &*panic_err;
                        let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        worker_bus.publish(Event::observer_panicked(obs.name(), info));
                    }
                }
            });
            channels.push(ObserverChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of observers in the set.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all observers without awaiting them.
    ///
    /// Overflow events are not re-reported when they themselves overflow.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        let is_overflow_evt = matches!(event.kind, EventKind::ObserverOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::observer_overflow(channel.name, reason));
            }
        }
    }

    /// Spawns a forwarder that feeds every bus event into this set.
    ///
    /// The forwarder stops when the bus closes or `stop` fires; on `stop` it
    /// first forwards whatever is already buffered.
    pub fn attach(self: Arc<Self>, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Ok(ev) => self.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "observer forwarder lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            self.emit(&ev);
                        }
                        break;
                    }
                }
            }
        })
    }

    /// Drops all queues and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}
