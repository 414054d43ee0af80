//! # Broker session contract.
//!
//! Components never speak a broker protocol themselves; they consume the
//! [`BrokerSession`] trait. Any broker integration must provide:
//! - **meta API**: list active subscriptions, look a subscription id up by topic,
//!   and an ordered stream of "subscription created" / "subscription deleted"
//!   meta-events;
//! - **RPC**: `register` a [`Callee`] under a procedure name and `call` it;
//! - **publish**: deliver an [`Envelope`] to a topic.
//!
//! [`LocalBroker`] is the in-process implementation used by the binary and tests.
//!
//! ```text
//!  BrokerSession ── MetaStream ──► PublishController ──► EventSource
//!        ▲                                │
//!        └──────────── publish ◄──────────┘
//!
//!  BrokerSession::call ──► Callee (ProcedureGateway) ──► Procedure
//! ```

mod local;
mod meta;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::SessionError;

pub use local::{LocalBroker, Subscription};
pub use meta::{MetaEvent, MetaStream, SubscriptionDetails};

/// Broker-allocated identifier of one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arguments of a remote procedure call: positional `args` plus keyword `kwargs`.
///
/// ```
/// use serde_json::json;
/// use socknet::Invocation;
///
/// let call = Invocation::new().kwarg("value", json!("hi"));
/// assert!(call.args.is_empty());
/// assert_eq!(call.kwargs.get("value"), Some(&json!("hi")));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Builds keyword arguments from a JSON object; any other value becomes the
    /// single positional argument.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(kwargs) => Self {
                args: Vec::new(),
                kwargs,
            },
            other => Self::new().arg(other),
        }
    }
}

/// Target of a registered procedure.
///
/// Whatever `on_call` returns is handed back to the caller unchanged; validation
/// failures are expressed as returned values, not as errors.
#[async_trait]
pub trait Callee: Send + Sync + 'static {
    async fn on_call(&self, call: Invocation) -> Value;
}

/// Primitives a component needs from a connected broker session.
#[async_trait]
pub trait BrokerSession: Send + Sync + 'static {
    /// Ids of all subscriptions currently registered on the broker.
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionId>, SessionError>;

    /// Id of the subscription serving `topic`, if any.
    async fn lookup_subscription(
        &self,
        topic: &str,
    ) -> Result<Option<SubscriptionId>, SessionError>;

    /// Subscribes to the "subscription created" and "subscription deleted"
    /// meta-topics. Events arrive on one stream, in broker order.
    async fn subscribe_meta(&self) -> Result<MetaStream, SessionError>;

    /// Registers `callee` under `procedure`.
    async fn register(
        &self,
        procedure: &str,
        callee: std::sync::Arc<dyn Callee>,
    ) -> Result<(), SessionError>;

    /// Calls a registered procedure and returns its result.
    async fn call(&self, procedure: &str, call: Invocation) -> Result<Value, SessionError>;

    /// Publishes `envelope` to every subscriber of `topic`.
    async fn publish(&self, topic: &str, envelope: &Envelope) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscription_id_is_transparent_on_the_wire() {
        let id = SubscriptionId::new(17);
        assert_eq!(serde_json::to_value(id).expect("encode"), json!(17));
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn invocation_from_object_fills_kwargs() {
        let call = Invocation::from_value(json!({"value": 3}));
        assert!(call.args.is_empty());
        assert_eq!(call.kwargs.get("value"), Some(&json!(3)));
    }

    #[test]
    fn invocation_from_scalar_is_positional() {
        let call = Invocation::from_value(json!("x"));
        assert_eq!(call.args, vec![json!("x")]);
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn invocation_decodes_with_missing_fields() {
        let call: Invocation = serde_json::from_value(json!({"kwargs": {"a": 1}})).expect("decode");
        assert!(call.args.is_empty());
        assert_eq!(call.kwargs.len(), 1);
    }
}
