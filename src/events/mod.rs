//! Lifecycle events: data model and broadcast bus.
//!
//! Components publish [`Event`]s describing what they do to the subscription
//! bookkeeping, emission tasks and procedure registrations. Observers
//! (see [`crate::observers`]) consume them; nothing in the control path depends
//! on an event being delivered.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `PublishController` (meta-event handling, shutdown),
//!   emission tasks, `ProcedureGateway`, `ObserverSet` workers (overflow/panic).
//! - **Consumers**: the `ObserverSet` forwarder, tests.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, StopReason};
