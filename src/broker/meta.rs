//! Subscription meta-events.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::SubscriptionId;

/// Payload of a "subscription created" meta-event.
///
/// `id` is `None` for brokers whose create payload only names the topic; the
/// controller then resolves it with
/// [`lookup_subscription`](super::BrokerSession::lookup_subscription).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDetails {
    /// Broker id of the new subscription, if the broker sends it.
    #[serde(default)]
    pub id: Option<SubscriptionId>,
    /// Topic URI the subscription targets.
    pub uri: String,
}

impl SubscriptionDetails {
    /// Details carrying the broker-allocated id.
    pub fn new(id: SubscriptionId, uri: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            uri: uri.into(),
        }
    }

    /// Details naming only the topic.
    pub fn topic_only(uri: impl Into<String>) -> Self {
        Self {
            id: None,
            uri: uri.into(),
        }
    }
}

/// Broker notification about the subscription table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaEvent {
    Created(SubscriptionDetails),
    Deleted(SubscriptionId),
}

/// Ordered, lossless stream of meta-events.
///
/// Yields `None` once the session that produced it is gone.
#[derive(Debug)]
pub struct MetaStream {
    rx: mpsc::UnboundedReceiver<MetaEvent>,
}

impl MetaStream {
    /// Wraps a receiver fed by a broker integration.
    pub fn new(rx: mpsc::UnboundedReceiver<MetaEvent>) -> Self {
        Self { rx }
    }

    /// Creates a connected sender/stream pair.
    pub fn channel() -> (mpsc::UnboundedSender<MetaEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    pub async fn recv(&mut self) -> Option<MetaEvent> {
        self.rx.recv().await
    }
}
