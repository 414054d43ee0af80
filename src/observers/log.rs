//! # LogWriter - lifecycle events to `tracing`
//!
//! Maps every [`Event`] to one `tracing` record under the `socknet::events`
//! target. Levels:
//! - `warn`: stale subscriptions, unresolved creates, rejected calls, grace exceeded,
//!   observer overflow
//! - `error`: emission faults, observer panics
//! - `info`: registration, shutdown milestones
//! - `debug`: per-subscription bookkeeping and emission start/stop
//!
//! ## Example output (fmt layer)
//! ```text
//! WARN socknet::events: existing subscriptions cannot receive events ids="101, 102"
//! DEBUG socknet::events: created subscription subscription=103 topic="3"
//! DEBUG socknet::events: stopping events being published to topic subscription=103 topic="3" reason=deleted published=4
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observer;

const TARGET: &str = "socknet::events";

/// Observer writing events to the installed `tracing` subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        let sub = e.subscription.map(|id| id.get());
        let topic = e.topic.as_deref();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::StaleSubscriptions => {
                tracing::warn!(
                    target: TARGET,
                    ids = reason,
                    count = e.count,
                    "existing subscriptions cannot receive events"
                );
            }
            EventKind::MetaSubscribed => {
                tracing::debug!(target: TARGET, "subscribed to subscription meta-events");
            }
            EventKind::SubscriptionCreated => {
                tracing::debug!(target: TARGET, subscription = sub, topic, "created subscription");
            }
            EventKind::SubscriptionDeleted => {
                tracing::debug!(target: TARGET, subscription = sub, "deleted subscription");
            }
            EventKind::SubscriptionUnresolved => {
                tracing::warn!(target: TARGET, topic, "subscription vanished before lookup");
            }
            EventKind::EmissionStarted => {
                tracing::debug!(
                    target: TARGET,
                    subscription = sub,
                    topic,
                    "publishing events to topic"
                );
            }
            EventKind::EmissionStopped => {
                tracing::debug!(
                    target: TARGET,
                    subscription = sub,
                    topic,
                    reason = e.stop.map(|s| s.as_str()),
                    published = e.count,
                    "stopping events being published to topic"
                );
            }
            EventKind::EmissionFailed => {
                tracing::error!(
                    target: TARGET,
                    subscription = sub,
                    topic,
                    error = reason,
                    published = e.count,
                    "emission task failed"
                );
            }
            EventKind::ProcedureRegistered => {
                tracing::info!(target: TARGET, rpc = e.procedure.as_deref(), "registered procedure");
            }
            EventKind::CallRejected => {
                tracing::warn!(
                    target: TARGET,
                    rpc = e.procedure.as_deref(),
                    reason,
                    "rejected procedure call"
                );
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: TARGET, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: TARGET, "all emission tasks stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: TARGET, stuck = e.count, "shutdown grace exceeded");
            }
            EventKind::ObserverOverflow => {
                tracing::warn!(
                    target: TARGET,
                    observer = e.observer,
                    reason,
                    "observer dropped an event"
                );
            }
            EventKind::ObserverPanicked => {
                tracing::error!(
                    target: TARGET,
                    observer = e.observer,
                    info = reason,
                    "observer panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
