//! # Lifecycle event observers.
//!
//! This module provides the [`Observer`] trait and the fan-out machinery that
//! delivers [`Bus`](crate::events::Bus) events to observers.
//!
//! ## Architecture
//! ```text
//!   emission task ── publish(Event) ──► Bus ──► ObserverSet::attach() forwarder
//!                                                   │
//!                                        ┌──────────┼──────────┐
//!                                        ▼          ▼          ▼
//!                                    LogWriter   metrics    custom ...
//! ```
//!
//! ## Implementing custom observers
//! ```no_run
//! use async_trait::async_trait;
//! use socknet::{Event, EventKind, Observer};
//!
//! struct Failures;
//!
//! #[async_trait]
//! impl Observer for Failures {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::EmissionFailed {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

mod log;
mod observer;
mod set;

pub use log::LogWriter;
pub use observer::Observer;
pub use set::ObserverSet;
