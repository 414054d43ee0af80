//! # Lifecycle events emitted by socknet components.
//!
//! [`EventKind`] groups events into four families:
//! - **Subscription bookkeeping**: meta-events processed by the controller
//! - **Emission**: start/stop/failure of per-subscription emission tasks
//! - **Procedures**: registration and rejected calls
//! - **Runtime**: shutdown and observer health
//!
//! [`Event`] carries the metadata; which optional fields are set depends on the kind.
//!
//! ## Ordering guarantees
//! Each event gets a process-wide, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use socknet::{Event, EventKind, SubscriptionId};
//!
//! let ev = Event::new(EventKind::SubscriptionCreated)
//!     .with_subscription(SubscriptionId::new(3))
//!     .with_topic("3");
//!
//! assert_eq!(ev.kind, EventKind::SubscriptionCreated);
//! assert_eq!(ev.topic.as_deref(), Some("3"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::broker::SubscriptionId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscription bookkeeping ===
    /// Subscriptions already existed when the controller joined; nothing will
    /// be published to them.
    ///
    /// Sets: `count`, `reason` (comma-separated ids)
    StaleSubscriptions,

    /// Controller subscribed to the create/delete meta-topics.
    MetaSubscribed,

    /// A subscription id entered the active set.
    ///
    /// Sets: `subscription`, `topic`
    SubscriptionCreated,

    /// A subscription id left the active set.
    ///
    /// Sets: `subscription`
    SubscriptionDeleted,

    /// A create meta-event could not be resolved to a live subscription id.
    ///
    /// Sets: `topic`
    SubscriptionUnresolved,

    // === Emission ===
    /// Emission task spawned.
    ///
    /// Sets: `subscription`, `topic`
    EmissionStarted,

    /// Emission task ended normally.
    ///
    /// Sets: `subscription`, `topic`, `stop`, `count` (events published)
    EmissionStopped,

    /// Emission task ended on a publish fault.
    ///
    /// Sets: `subscription`, `topic`, `reason`, `count`
    EmissionFailed,

    // === Procedures ===
    /// Procedure registered with the broker.
    ///
    /// Sets: `procedure`
    ProcedureRegistered,

    /// A call failed validation and got an error payload back.
    ///
    /// Sets: `procedure`, `reason`
    CallRejected,

    // === Runtime ===
    /// Shutdown requested.
    ShutdownRequested,

    /// All emission tasks stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some emission tasks did not stop in time.
    ///
    /// Sets: `count` (stuck tasks)
    GraceExceeded,

    /// Observer dropped an event (queue full or worker closed).
    ///
    /// Sets: `observer`, `reason`
    ObserverOverflow,

    /// Observer panicked while handling an event.
    ///
    /// Sets: `observer`, `reason`
    ObserverPanicked,
}

/// Why an emission task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Its subscription id was no longer active.
    Deleted,
    /// The event source answered with an error payload.
    SourceError,
    /// The controller is shutting down.
    Shutdown,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Deleted => "deleted",
            StopReason::SourceError => "source_error",
            StopReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Subscription id, if applicable.
    pub subscription: Option<SubscriptionId>,
    /// Topic URI, if applicable.
    pub topic: Option<Arc<str>>,
    /// Procedure name, if applicable.
    pub procedure: Option<Arc<str>>,
    /// Observer name, if applicable.
    pub observer: Option<&'static str>,
    /// Human-readable reason (errors, overflow details, id lists).
    pub reason: Option<Arc<str>>,
    /// Emission stop reason.
    pub stop: Option<StopReason>,
    /// Generic counter (published events, stuck tasks, stale subscriptions).
    pub count: Option<u64>,
}

impl Event {
    /// Creates an event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subscription: None,
            topic: None,
            procedure: None,
            observer: None,
            reason: None,
            stop: None,
            count: None,
        }
    }

    #[inline]
    pub fn with_subscription(mut self, id: SubscriptionId) -> Self {
        self.subscription = Some(id);
        self
    }

    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[inline]
    pub fn with_procedure(mut self, name: impl Into<Arc<str>>) -> Self {
        self.procedure = Some(name.into());
        self
    }

    #[inline]
    pub fn with_observer(mut self, name: &'static str) -> Self {
        self.observer = Some(name);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_stop(mut self, stop: StopReason) -> Self {
        self.stop = Some(stop);
        self
    }

    #[inline]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_observer(observer)
            .with_reason(format!("observer={observer} reason={reason}"))
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_observer(observer)
            .with_reason(info)
    }

    #[inline]
    pub fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, EventKind::ObserverOverflow)
    }
}
