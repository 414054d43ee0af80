//! # Publish lifecycle controller.
//!
//! - [`SubscriptionRegistry`] holds the active set.
//! - [`PublishController`] reacts to subscription meta-events and owns the
//!   registry, the source map and the emission tasks.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use socknet::{LocalBroker, MultiTableSource, PublishConfig, PublishController};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let broker = LocalBroker::new();
//! let ctrl = PublishController::builder(
//!     PublishConfig::new(10.0)?,
//!     Arc::new(broker.clone()),
//!     Arc::new(MultiTableSource),
//! )
//! .build();
//!
//! let listener = ctrl.start().await?;
//! let mut sub = broker.subscribe("3")?;
//! let first = sub.recv().await;
//! ctrl.shutdown().await?;
//! listener.await??;
//! # let _ = first;
//! # Ok(())
//! # }
//! ```

mod emitter;
mod publisher;
mod registry;

pub use publisher::{PublishController, PublishControllerBuilder};
pub use registry::SubscriptionRegistry;
