//! In-process broker implementing [`BrokerSession`].
//!
//! All state sits behind one `parking_lot` mutex; meta-events are pushed while
//! the lock is held, so every [`MetaStream`] sees creates and deletes in the
//! order the table changed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    BrokerSession, Callee, Invocation, MetaEvent, MetaStream, SubscriptionDetails, SubscriptionId,
};
use crate::envelope::Envelope;
use crate::error::SessionError;

struct SubEntry {
    topic: String,
    tx: mpsc::UnboundedSender<Envelope>,
}

#[derive(Default)]
struct State {
    closed: bool,
    next_id: u64,
    subs: BTreeMap<SubscriptionId, SubEntry>,
    meta: Vec<mpsc::UnboundedSender<MetaEvent>>,
    procedures: HashMap<String, Arc<dyn Callee>>,
}

impl State {
    fn announce(&mut self, event: MetaEvent) {
        self.meta.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn remove(&mut self, id: SubscriptionId) {
        if self.subs.remove(&id).is_some() {
            self.announce(MetaEvent::Deleted(id));
        }
    }
}

struct Inner {
    state: Mutex<State>,
}

/// In-memory broker: topics, subscriptions, procedures and meta-events.
///
/// Cloning is cheap; clones share one broker.
///
/// ```
/// use socknet::{BrokerSession, Envelope, LocalBroker};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let broker = LocalBroker::new();
/// let mut sub = broker.subscribe("3").expect("open broker");
/// broker.publish("3", &Envelope::data(3.0)).await.expect("publish");
/// assert_eq!(sub.recv().await, Some(Envelope::data(3.0)));
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBroker {
    inner: Arc<Inner>,
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Subscribes a client to `topic`.
    ///
    /// Every call allocates a fresh id and announces it on all meta streams.
    /// Dropping the returned handle deletes the subscription.
    pub fn subscribe(&self, topic: impl Into<String>) -> Result<Subscription, SessionError> {
        let topic = topic.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        state.next_id += 1;
        let id = SubscriptionId::new(state.next_id);
        state.subs.insert(
            id,
            SubEntry {
                topic: topic.clone(),
                tx,
            },
        );
        state.announce(MetaEvent::Created(SubscriptionDetails::new(id, topic.clone())));
        drop(state);

        Ok(Subscription {
            id,
            topic,
            rx,
            broker: Arc::downgrade(&self.inner),
        })
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .state
            .lock()
            .subs
            .values()
            .filter(|e| e.topic == topic)
            .count()
    }

    /// Closes the session: meta streams and subscriptions end, further
    /// primitives fail with [`SessionError::Closed`].
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        state.meta.clear();
        state.subs.clear();
        state.procedures.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    fn open(&self) -> Result<parking_lot::MutexGuard<'_, State>, SessionError> {
        let state = self.inner.state.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        Ok(state)
    }
}

#[async_trait]
impl BrokerSession for LocalBroker {
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionId>, SessionError> {
        let state = self.open()?;
        Ok(state.subs.keys().copied().collect())
    }

    async fn lookup_subscription(
        &self,
        topic: &str,
    ) -> Result<Option<SubscriptionId>, SessionError> {
        let state = self.open()?;
        Ok(state
            .subs
            .iter()
            .rev()
            .find(|(_, e)| e.topic == topic)
            .map(|(id, _)| *id))
    }

    async fn subscribe_meta(&self) -> Result<MetaStream, SessionError> {
        let mut state = self.open()?;
        let (tx, stream) = MetaStream::channel();
        state.meta.push(tx);
        Ok(stream)
    }

    async fn register(&self, procedure: &str, callee: Arc<dyn Callee>) -> Result<(), SessionError> {
        let mut state = self.open()?;
        if state.procedures.contains_key(procedure) {
            return Err(SessionError::AlreadyRegistered(procedure.to_string()));
        }
        state.procedures.insert(procedure.to_string(), callee);
        Ok(())
    }

    async fn call(&self, procedure: &str, call: Invocation) -> Result<Value, SessionError> {
        let callee = {
            let state = self.open()?;
            state
                .procedures
                .get(procedure)
                .cloned()
                .ok_or_else(|| SessionError::NoSuchProcedure(procedure.to_string()))?
        };
        Ok(callee.on_call(call).await)
    }

    async fn publish(&self, topic: &str, envelope: &Envelope) -> Result<(), SessionError> {
        let state = self.open()?;
        for entry in state.subs.values().filter(|e| e.topic == topic) {
            // A receiver that went away is removed by its handle's Drop.
            let _ = entry.tx.send(envelope.clone());
        }
        Ok(())
    }
}

/// Client-side subscription handle returned by [`LocalBroker::subscribe`].
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    rx: mpsc::UnboundedReceiver<Envelope>,
    broker: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next published envelope; `None` once the broker closed.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Envelope, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Deletes the subscription. Same as dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.broker.upgrade() {
            inner.state.lock().remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Doubler;

    #[async_trait]
    impl Callee for Doubler {
        async fn on_call(&self, call: Invocation) -> Value {
            let n = call.kwargs.get("n").and_then(Value::as_i64).unwrap_or(0);
            json!(n * 2)
        }
    }

    #[tokio::test]
    async fn subscribe_and_drop_announce_in_order() {
        let broker = LocalBroker::new();
        let mut meta = broker.subscribe_meta().await.expect("meta");

        let sub = broker.subscribe("a").expect("subscribe");
        let id = sub.id();
        drop(sub);

        assert_eq!(
            meta.recv().await,
            Some(MetaEvent::Created(SubscriptionDetails::new(id, "a")))
        );
        assert_eq!(meta.recv().await, Some(MetaEvent::Deleted(id)));
    }

    #[tokio::test]
    async fn every_subscribe_gets_a_fresh_id() {
        let broker = LocalBroker::new();
        let a = broker.subscribe("t").expect("a");
        let b = broker.subscribe("t").expect("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(broker.subscriber_count("t"), 2);
        assert_eq!(
            broker.list_subscriptions().await.expect("list"),
            vec![a.id(), b.id()]
        );
    }

    #[tokio::test]
    async fn lookup_returns_newest_live_id() {
        let broker = LocalBroker::new();
        let a = broker.subscribe("t").expect("a");
        let b = broker.subscribe("t").expect("b");
        assert_eq!(broker.lookup_subscription("t").await.expect("lookup"), Some(b.id()));

        b.unsubscribe();
        assert_eq!(broker.lookup_subscription("t").await.expect("lookup"), Some(a.id()));

        drop(a);
        assert_eq!(broker.lookup_subscription("t").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn publish_reaches_only_matching_topic() {
        let broker = LocalBroker::new();
        let mut a = broker.subscribe("a").expect("a");
        let mut b = broker.subscribe("b").expect("b");

        broker.publish("a", &Envelope::data(1)).await.expect("publish");

        assert_eq!(a.try_recv().ok(), Some(Envelope::data(1)));
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn register_and_call() {
        let broker = LocalBroker::new();
        broker.register("double", Arc::new(Doubler)).await.expect("register");

        let out = broker
            .call("double", Invocation::new().kwarg("n", 21))
            .await
            .expect("call");
        assert_eq!(out, json!(42));

        let dup = broker.register("double", Arc::new(Doubler)).await;
        assert_eq!(dup, Err(SessionError::AlreadyRegistered("double".into())));

        let missing = broker.call("nope", Invocation::new()).await;
        assert_eq!(missing, Err(SessionError::NoSuchProcedure("nope".into())));
    }

    #[tokio::test]
    async fn close_ends_streams_and_rejects_primitives() {
        let broker = LocalBroker::new();
        let mut meta = broker.subscribe_meta().await.expect("meta");
        let mut sub = broker.subscribe("t").expect("sub");
        let _ = meta.recv().await;

        broker.close();

        assert_eq!(meta.recv().await, None);
        assert_eq!(sub.recv().await, None);
        assert_eq!(
            broker.publish("t", &Envelope::data(1)).await,
            Err(SessionError::Closed)
        );
        assert!(broker.subscribe("t").is_err());
        assert!(broker.is_closed());
    }
}
