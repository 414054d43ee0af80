//! # PublishController: subscription-driven publish lifecycle.
//!
//! Subscribes to the broker's subscription meta-events and runs one emission
//! task per active subscription.
//!
//! ## Architecture
//! ```text
//! start()
//!   ├─► on_join()
//!   │     ├─► list_subscriptions()  → StaleSubscriptions (not adopted)
//!   │     └─► subscribe_meta()      → MetaSubscribed
//!   └─► listener (tracked task)
//!         ├─► Created(details) → on_create_subscription()
//!         │                        ├─► details.id, or lookup_subscription(uri)
//!         │                        ├─► registry.insert(id)
//!         │                        └─► spawn Emitter(id, uri)
//!         ├─► Deleted(id)      → on_delete_subscription()
//!         │                        └─► registry.remove(id)?  (fault if unknown)
//!         └─► stream end       → Err(MetaStreamClosed)
//!
//! shutdown()
//!   ├─► ShutdownRequested, cancel runtime token
//!   └─► wait tracked tasks up to grace
//!         ├─ Ok      → AllStoppedWithin
//!         └─ timeout → GraceExceeded, Err(RuntimeError::GraceExceeded)
//! ```
//!
//! ## Rules
//! - Emission is keyed by **subscription id**, not topic: two subscriptions on
//!   one topic run two independent emitters (duplicate events on that topic).
//! - A create for an id that is already active starts nothing.
//! - A delete for an id that is not active is fatal for the listener.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::broker::{BrokerSession, MetaEvent, MetaStream, SubscriptionDetails, SubscriptionId};
use crate::config::{PublishConfig, RuntimeConfig};
use crate::controller::emitter::{Emitter, EmitterCtx, Running};
use crate::controller::SubscriptionRegistry;
use crate::error::{ControllerError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::observers::{Observer, ObserverSet};
use crate::source::{SourceFactory, SourceMap};

struct Observing {
    set: Arc<ObserverSet>,
    forwarder: JoinHandle<()>,
    stop: CancellationToken,
}

/// Owns the active set and the source map; spawns and reaps emitters.
pub struct PublishController {
    cfg: PublishConfig,
    runtime: RuntimeConfig,
    session: Arc<dyn BrokerSession>,
    registry: Arc<SubscriptionRegistry>,
    sources: Arc<SourceMap>,
    bus: Bus,
    running: Running,
    runtime_token: CancellationToken,
    tracker: TaskTracker,
    observing: Mutex<Option<Observing>>,
}

/// Builder for [`PublishController`].
pub struct PublishControllerBuilder {
    cfg: PublishConfig,
    session: Arc<dyn BrokerSession>,
    factory: Arc<dyn SourceFactory>,
    runtime: RuntimeConfig,
    bus: Option<Bus>,
    observers: Vec<Arc<dyn Observer>>,
}

impl PublishControllerBuilder {
    /// Overrides shutdown grace and bus capacity.
    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Publishes lifecycle events on an existing bus instead of a new one.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Observers fed from the controller's bus until shutdown.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observer>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the controller. Must be called within a tokio runtime when
    /// observers are configured.
    pub fn build(self) -> Arc<PublishController> {
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.runtime.bus_capacity_clamped()));

        let observing = if self.observers.is_empty() {
            None
        } else {
            let set = Arc::new(ObserverSet::new(self.observers, bus.clone()));
            let stop = CancellationToken::new();
            let forwarder = set.clone().attach(stop.clone());
            Some(Observing {
                set,
                forwarder,
                stop,
            })
        };

        Arc::new(PublishController {
            cfg: self.cfg,
            runtime: self.runtime,
            session: self.session,
            registry: Arc::new(SubscriptionRegistry::new()),
            sources: Arc::new(SourceMap::new(self.factory)),
            bus,
            running: Arc::new(Mutex::new(HashSet::new())),
            runtime_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            observing: Mutex::new(observing),
        })
    }
}

impl PublishController {
    /// Starts building a controller for `session`, producing events from
    /// sources built by `factory`.
    ///
    /// `cfg` is already validated, so a controller can never exist without a
    /// usable interval.
    pub fn builder(
        cfg: PublishConfig,
        session: Arc<dyn BrokerSession>,
        factory: Arc<dyn SourceFactory>,
    ) -> PublishControllerBuilder {
        PublishControllerBuilder {
            cfg,
            session,
            factory,
            runtime: RuntimeConfig::default(),
            bus: None,
            observers: Vec::new(),
        }
    }

    /// Lifecycle event bus of this controller.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn config(&self) -> &PublishConfig {
        &self.cfg
    }

    /// Sorted snapshot of the active set.
    pub async fn active(&self) -> Vec<SubscriptionId> {
        self.registry.snapshot().await
    }

    /// Joins the session: reports pre-existing subscriptions and subscribes to
    /// the subscription meta-events.
    ///
    /// Pre-existing subscriptions are **not** adopted; nothing is published to
    /// them.
    pub async fn on_join(&self) -> Result<MetaStream, ControllerError> {
        let existing = self.session.list_subscriptions().await?;
        if !existing.is_empty() {
            let ids = existing
                .iter()
                .map(SubscriptionId::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.bus.publish(
                Event::new(EventKind::StaleSubscriptions)
                    .with_reason(ids)
                    .with_count(existing.len() as u64),
            );
        }

        let meta = self.session.subscribe_meta().await?;
        self.bus.publish(Event::new(EventKind::MetaSubscribed));
        Ok(meta)
    }

    /// Handles a "subscription created" meta-event.
    ///
    /// Takes the id carried by the event; only a topic-only payload is
    /// resolved through [`BrokerSession::lookup_subscription`]. Marks the id
    /// active and spawns its emitter. Returns the id that started emitting, if
    /// any.
    pub async fn on_create_subscription(
        &self,
        details: SubscriptionDetails,
    ) -> Result<Option<SubscriptionId>, ControllerError> {
        let topic: Arc<str> = Arc::from(details.uri.as_str());

        let id = match details.id {
            Some(id) => Some(id),
            None => self.session.lookup_subscription(&topic).await?,
        };
        let Some(id) = id else {
            self.bus
                .publish(Event::new(EventKind::SubscriptionUnresolved).with_topic(topic));
            return Ok(None);
        };

        if !self.registry.insert(id).await {
            return Ok(None);
        }
        self.bus.publish(
            Event::new(EventKind::SubscriptionCreated)
                .with_subscription(id)
                .with_topic(topic.clone()),
        );

        self.spawn_emitter(id, topic);
        Ok(Some(id))
    }

    /// Handles a "subscription deleted" meta-event.
    ///
    /// The emitter notices at its next wake-up. An id that is not active is an
    /// inconsistency fault and is returned as an error.
    pub async fn on_delete_subscription(&self, id: SubscriptionId) -> Result<(), ControllerError> {
        self.registry.remove(id).await?;
        self.bus
            .publish(Event::new(EventKind::SubscriptionDeleted).with_subscription(id));
        Ok(())
    }

    /// Joins the session and spawns the meta-event listener.
    ///
    /// The meta subscription is in place when this returns. The listener ends
    /// with `Ok(())` on shutdown and with an error on any fault.
    pub async fn start(
        self: &Arc<Self>,
    ) -> Result<JoinHandle<Result<(), ControllerError>>, ControllerError> {
        let meta = self.on_join().await?;
        let me = Arc::clone(self);

        Ok(self.tracker.spawn(async move {
            let res = me.listen(meta).await;
            if let Err(e) = &res {
                tracing::error!(error = %e, label = e.as_label(), "meta-event listener stopped");
            }
            res
        }))
    }

    async fn listen(&self, mut meta: MetaStream) -> Result<(), ControllerError> {
        loop {
            select! {
                biased;
                _ = self.runtime_token.cancelled() => return Ok(()),
                ev = meta.recv() => match ev {
                    Some(MetaEvent::Created(details)) => {
                        self.on_create_subscription(details).await?;
                    }
                    Some(MetaEvent::Deleted(id)) => self.on_delete_subscription(id).await?,
                    None => return Err(ControllerError::MetaStreamClosed),
                }
            }
        }
    }

    fn spawn_emitter(&self, id: SubscriptionId, topic: Arc<str>) {
        let ctx = EmitterCtx {
            interval: self.cfg.interval(),
            registry: self.registry.clone(),
            sources: self.sources.clone(),
            session: self.session.clone(),
            bus: self.bus.clone(),
            running: self.running.clone(),
        };
        self.running.lock().insert(id);
        let emitter = Emitter::new(id, topic, ctx);
        self.tracker.spawn(emitter.run(self.runtime_token.clone()));
    }

    /// Stops the listener and all emitters, waiting up to the configured grace.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] and returns
    /// [`RuntimeError::GraceExceeded`] with the stuck subscription ids.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();
        self.tracker.close();

        let grace = self.runtime.grace;
        let res = match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let mut stuck: Vec<SubscriptionId> = self.running.lock().iter().copied().collect();
                stuck.sort_unstable();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_count(stuck.len() as u64),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        };

        self.finish_observers().await;
        res
    }

    async fn finish_observers(&self) {
        let observing = self.observing.lock().take();
        let Some(observing) = observing else {
            return;
        };
        observing.stop.cancel();
        let _ = observing.forwarder.await;
        if let Ok(set) = Arc::try_unwrap(observing.set) {
            set.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBroker;
    use crate::envelope::Envelope;
    use crate::events::StopReason;
    use crate::source::MultiTableSource;
    use tokio::sync::broadcast;

    fn controller(broker: &LocalBroker, secs: f64) -> Arc<PublishController> {
        PublishController::builder(
            PublishConfig::new(secs).expect("valid interval"),
            Arc::new(broker.clone()),
            Arc::new(MultiTableSource),
        )
        .build()
    }

    async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = rx.recv().await.expect("bus open");
            if ev.kind == kind {
                return ev;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_starts_emission_and_delete_stops_it() {
        let broker = LocalBroker::new();
        let ctrl = controller(&broker, 0.01);
        let mut events = ctrl.bus().subscribe();
        let _listener = ctrl.start().await.expect("start");

        let mut sub = broker.subscribe("3").expect("subscribe");
        assert_eq!(sub.recv().await, Some(Envelope::data(3.0)));
        assert_eq!(sub.recv().await, Some(Envelope::data(6.0)));
        assert_eq!(ctrl.active().await, vec![sub.id()]);

        let id = sub.id();
        drop(sub);

        let stopped = next_of(&mut events, EventKind::EmissionStopped).await;
        assert_eq!(stopped.subscription, Some(id));
        assert_eq!(stopped.stop, Some(StopReason::Deleted));
        assert!(ctrl.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn source_error_ends_emission_without_publishing() {
        let broker = LocalBroker::new();
        let ctrl = controller(&broker, 0.01);
        let mut events = ctrl.bus().subscribe();
        let _listener = ctrl.start().await.expect("start");

        let mut sub = broker.subscribe("not-a-number").expect("subscribe");
        let stopped = next_of(&mut events, EventKind::EmissionStopped).await;
        assert_eq!(stopped.stop, Some(StopReason::SourceError));
        assert_eq!(stopped.count, Some(0));
        assert!(sub.try_recv().is_err());

        // The id stays active until the subscriber leaves.
        assert_eq!(ctrl.active().await, vec![sub.id()]);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_a_fault() {
        let broker = LocalBroker::new();
        let ctrl = controller(&broker, 1.0);
        let err = ctrl
            .on_delete_subscription(SubscriptionId::new(42))
            .await
            .expect_err("fault");
        assert_eq!(
            err,
            ControllerError::UnknownSubscription {
                id: SubscriptionId::new(42)
            }
        );
    }

    #[tokio::test]
    async fn join_reports_but_does_not_adopt_existing_subscriptions() {
        let broker = LocalBroker::new();
        let early = broker.subscribe("5").expect("subscribe");
        let ctrl = controller(&broker, 1.0);
        let mut events = ctrl.bus().subscribe();

        let _meta = ctrl.on_join().await.expect("join");

        let stale = next_of(&mut events, EventKind::StaleSubscriptions).await;
        assert_eq!(stale.count, Some(1));
        assert_eq!(stale.reason.as_deref(), Some(early.id().to_string().as_str()));
        next_of(&mut events, EventKind::MetaSubscribed).await;
        assert!(ctrl.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_emitters_within_grace() {
        let broker = LocalBroker::new();
        let ctrl = controller(&broker, 10.0);
        let listener = ctrl.start().await.expect("start");

        let mut sub = broker.subscribe("2").expect("subscribe");
        assert_eq!(sub.recv().await, Some(Envelope::data(2.0)));

        let mut events = ctrl.bus().subscribe();
        ctrl.shutdown().await.expect("within grace");

        let stopped = next_of(&mut events, EventKind::EmissionStopped).await;
        assert_eq!(stopped.stop, Some(StopReason::Shutdown));
        next_of(&mut events, EventKind::AllStoppedWithin).await;
        assert_eq!(listener.await.expect("join"), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_ends_emission() {
        let broker = LocalBroker::new();
        let ctrl = controller(&broker, 0.01);
        let mut events = ctrl.bus().subscribe();
        let listener = ctrl.start().await.expect("start");

        let mut sub = broker.subscribe("4").expect("subscribe");
        assert_eq!(sub.recv().await, Some(Envelope::data(4.0)));
        broker.close();

        let failed = next_of(&mut events, EventKind::EmissionFailed).await;
        assert_eq!(failed.count, Some(1));
        assert!(failed.reason.is_some());
        assert_eq!(
            listener.await.expect("join"),
            Err(ControllerError::MetaStreamClosed)
        );
    }
}
