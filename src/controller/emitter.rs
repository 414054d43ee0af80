//! # Emitter: one emission task per active subscription.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► env = sources.fetch(topic)
//!   ├─► id not active?      → stop (Deleted)
//!   ├─► env is "error"?     → stop (SourceError)
//!   ├─► session.publish(topic, env)
//!   │     └─ Err            → EmissionFailed, exit
//!   └─► sleep(interval)     (runtime token → stop (Shutdown))
//! }
//! ```
//!
//! ## Rules
//! - Deletion is **polled**: the active check runs at the start of every
//!   iteration, before any publish, so at most one tick passes between removal
//!   and exit.
//! - The runtime token only wakes the sleep for shutdown; it is never used to
//!   stop a single subscription.
//! - No timeout on `publish`; its failure ends the task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::broker::{BrokerSession, SubscriptionId};
use crate::controller::SubscriptionRegistry;
use crate::error::SessionError;
use crate::events::{Bus, Event, EventKind, StopReason};
use crate::source::SourceMap;

/// Ids whose emission tasks are still running (used to report stuck tasks).
pub(crate) type Running = Arc<Mutex<HashSet<SubscriptionId>>>;

/// How an emission task ended.
#[derive(Debug)]
pub(crate) enum EmitterExit {
    Stopped(StopReason),
    Failed(SessionError),
}

/// Shared handles an emitter reads from.
#[derive(Clone)]
pub(crate) struct EmitterCtx {
    pub interval: Duration,
    pub registry: Arc<SubscriptionRegistry>,
    pub sources: Arc<SourceMap>,
    pub session: Arc<dyn BrokerSession>,
    pub bus: Bus,
    pub running: Running,
}

/// Emission task bound to one (subscription, topic) pair.
pub(crate) struct Emitter {
    id: SubscriptionId,
    topic: Arc<str>,
    ctx: EmitterCtx,
}

struct RunningGuard {
    id: SubscriptionId,
    running: Running,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.lock().remove(&self.id);
    }
}

impl Emitter {
    pub(crate) fn new(id: SubscriptionId, topic: Arc<str>, ctx: EmitterCtx) -> Self {
        Self { id, topic, ctx }
    }

    /// Runs the loop until the subscription is deleted, the source errors,
    /// a publish fails or `runtime_token` fires.
    ///
    /// The caller marks the id in `running` before spawning; the mark is
    /// cleared when this future completes.
    pub(crate) async fn run(self, runtime_token: CancellationToken) -> EmitterExit {
        let _guard = RunningGuard {
            id: self.id,
            running: self.ctx.running.clone(),
        };

        self.ctx.bus.publish(
            Event::new(EventKind::EmissionStarted)
                .with_subscription(self.id)
                .with_topic(self.topic.clone()),
        );

        let mut published: u64 = 0;
        let exit = self.emit_loop(&runtime_token, &mut published).await;

        let ev = match &exit {
            EmitterExit::Stopped(reason) => Event::new(EventKind::EmissionStopped).with_stop(*reason),
            EmitterExit::Failed(e) => Event::new(EventKind::EmissionFailed).with_reason(e.to_string()),
        };
        self.ctx.bus.publish(
            ev.with_subscription(self.id)
                .with_topic(self.topic.clone())
                .with_count(published),
        );
        exit
    }

    async fn emit_loop(&self, runtime_token: &CancellationToken, published: &mut u64) -> EmitterExit {
        loop {
            if runtime_token.is_cancelled() {
                return EmitterExit::Stopped(StopReason::Shutdown);
            }

            let env = self.ctx.sources.fetch(&self.topic);

            if !self.ctx.registry.contains(self.id).await {
                return EmitterExit::Stopped(StopReason::Deleted);
            }
            if env.is_error() {
                return EmitterExit::Stopped(StopReason::SourceError);
            }

            if let Err(e) = self.ctx.session.publish(&self.topic, &env).await {
                return EmitterExit::Failed(e);
            }
            *published += 1;

            let sleep = time::sleep(self.ctx.interval);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = runtime_token.cancelled() => {
                    return EmitterExit::Stopped(StopReason::Shutdown);
                }
            }
        }
    }
}
