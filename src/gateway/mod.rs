//! # Procedure gateway.
//!
//! A [`ProcedureGateway`] registers one named procedure with the broker and
//! dispatches calls to a [`Procedure`]:
//!
//! ```text
//! BrokerSession::call(rpc, invocation)
//!     └─► ProcedureGateway::on_call
//!           ├─► procedure.validate(&invocation)
//!           │     └─ Err(msg) → {"response": "error", "data": msg}   (CallRejected)
//!           └─► procedure.call(invocation) → result, unchanged
//! ```
//!
//! Validation failures are data returned to the caller, never session errors.

mod echo;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::broker::{BrokerSession, Callee, Invocation};
use crate::config::ProcedureConfig;
use crate::envelope::Envelope;
use crate::error::SessionError;
use crate::events::{Bus, Event, EventKind};

pub use echo::{Echo, ECHO_USAGE};

/// Application logic behind a registered procedure.
#[async_trait]
pub trait Procedure: Send + Sync + 'static {
    /// Checks the call shape; `Err` carries the message returned to the caller.
    fn validate(&self, call: &Invocation) -> Result<(), String>;

    /// Runs the procedure on a validated call.
    async fn call(&self, call: Invocation) -> Value;
}

/// Registers a single procedure and guards it with validation.
pub struct ProcedureGateway {
    cfg: ProcedureConfig,
    procedure: Arc<dyn Procedure>,
    bus: Bus,
}

impl ProcedureGateway {
    /// The name comes from an already validated [`ProcedureConfig`], so it is
    /// never empty.
    pub fn new(cfg: ProcedureConfig, procedure: Arc<dyn Procedure>) -> Self {
        Self {
            cfg,
            procedure,
            bus: Bus::default(),
        }
    }

    /// Publishes lifecycle events on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    /// Registered procedure name.
    pub fn rpc(&self) -> &str {
        self.cfg.rpc()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registers this gateway under its procedure name.
    pub async fn on_join(self: &Arc<Self>, session: &dyn BrokerSession) -> Result<(), SessionError> {
        tracing::info!(rpc = self.rpc(), "registering procedure");
        session
            .register(self.rpc(), Arc::clone(self) as Arc<dyn Callee>)
            .await?;
        self.bus
            .publish(Event::new(EventKind::ProcedureRegistered).with_procedure(self.rpc()));
        Ok(())
    }

    /// Validates `call` and runs the procedure.
    pub async fn dispatch(&self, call: Invocation) -> Value {
        if let Err(msg) = self.procedure.validate(&call) {
            self.bus.publish(
                Event::new(EventKind::CallRejected)
                    .with_procedure(self.rpc())
                    .with_reason(msg.as_str()),
            );
            return Envelope::error(msg).into_value();
        }
        self.procedure.call(call).await
    }
}

#[async_trait]
impl Callee for ProcedureGateway {
    async fn on_call(&self, call: Invocation) -> Value {
        self.dispatch(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBroker;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Procedure for Counting {
        fn validate(&self, call: &Invocation) -> Result<(), String> {
            if call.kwargs.contains_key("n") {
                Ok(())
            } else {
                Err("need n".into())
            }
        }

        async fn call(&self, call: Invocation) -> Value {
            self.calls.fetch_add(1, Ordering::SeqCst);
            call.kwargs.get("n").cloned().unwrap_or(Value::Null)
        }
    }

    fn gateway(proc_: Arc<dyn Procedure>) -> Arc<ProcedureGateway> {
        Arc::new(ProcedureGateway::new(
            ProcedureConfig::new("sampleRPC").expect("valid rpc"),
            proc_,
        ))
    }

    #[tokio::test]
    async fn rejected_calls_never_reach_the_procedure() {
        let counting = Arc::new(Counting::default());
        let gw = gateway(counting.clone());
        let mut events = gw.bus().subscribe();

        let out = gw.dispatch(Invocation::new()).await;

        assert_eq!(out, json!({"response": "error", "data": "need n"}));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
        let ev = events.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::CallRejected);
        assert_eq!(ev.procedure.as_deref(), Some("sampleRPC"));
    }

    #[tokio::test]
    async fn valid_calls_return_the_result_unchanged() {
        let counting = Arc::new(Counting::default());
        let gw = gateway(counting.clone());

        let out = gw.dispatch(Invocation::new().kwarg("n", json!([1, 2]))).await;

        assert_eq!(out, json!([1, 2]));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn on_join_registers_under_rpc_name() {
        let broker = LocalBroker::new();
        let gw = gateway(Arc::new(Echo));
        let mut events = gw.bus().subscribe();

        gw.on_join(&broker).await.expect("register");

        let ev = events.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ProcedureRegistered);
        let out = broker
            .call("sampleRPC", Invocation::new().kwarg("value", "hello"))
            .await
            .expect("call");
        assert_eq!(out, json!("hello"));
    }

    #[tokio::test]
    async fn second_registration_fails() {
        let broker = LocalBroker::new();
        gateway(Arc::new(Echo)).on_join(&broker).await.expect("first");
        let err = gateway(Arc::new(Echo)).on_join(&broker).await;
        assert_eq!(err, Err(SessionError::AlreadyRegistered("sampleRPC".into())));
    }
}
