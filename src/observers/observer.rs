//! # Observer trait.
//!
//! Each observer gets its own bounded queue and worker task inside
//! [`ObserverSet`](crate::ObserverSet):
//! - a slow observer only fills its own queue;
//! - on overflow the event is dropped for that observer and
//!   `EventKind::ObserverOverflow` is published;
//! - panics are caught and published as `EventKind::ObserverPanicked`.

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of lifecycle events.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Processes a single event (FIFO per observer).
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
