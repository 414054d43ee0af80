//! WebSocket → broker bridge.
//!
//! ```text
//! {"request": "subscribe", "data": {"topic": t}} ──► LocalBroker::subscribe(t)
//!     reply {"response":"info","data":{"subscribed": t, "id": n}}
//!     then every envelope published to t, as binary frames, until the peer leaves
//!
//! {"request": <procedure>, "data": <kwargs>}     ──► BrokerSession::call
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::broker::{BrokerSession, Invocation, LocalBroker, Subscription};
use crate::envelope::Envelope;
use crate::error::WireError;
use crate::wire::protocol::WRONG_FORMAT;
use crate::wire::{MessageHandler, Outbound};

/// Request name that subscribes the peer to a topic.
pub const SUBSCRIBE_REQUEST: &str = "subscribe";
/// Reply to a subscribe request without a topic string.
pub const TOPIC_USAGE: &str = r#"Expected "topic" string in data"#;

/// Forwards `{"request": <procedure>, "data": <kwargs>}` to a broker call.
///
/// A result that already is an envelope (e.g. a validation error) is sent as
/// is; any other result is wrapped as `data`. Session failures are reported as
/// `error` envelopes.
///
/// With [`with_topics`](Self::with_topics), `"subscribe"` requests open a
/// broker subscription owned by the connection instead of calling a procedure.
pub struct BrokerBridge {
    session: Arc<dyn BrokerSession>,
    topics: Option<LocalBroker>,
}

impl BrokerBridge {
    pub fn new(session: Arc<dyn BrokerSession>) -> Self {
        Self {
            session,
            topics: None,
        }
    }

    /// Lets peers subscribe to topics of `broker`.
    pub fn with_topics(mut self, broker: LocalBroker) -> Self {
        self.topics = Some(broker);
        self
    }

    async fn call(&self, procedure: &str, data: Value, out: &Outbound) -> Result<(), WireError> {
        let call = Invocation::from_value(data);
        let reply = match self.session.call(procedure, call).await {
            Ok(result) => serde_json::from_value::<Envelope>(result.clone())
                .unwrap_or_else(|_| Envelope::data(result)),
            Err(e) => {
                tracing::warn!(rpc = procedure, error = %e, label = e.as_label(), "bridged call failed");
                Envelope::error(e.to_string())
            }
        };
        out.send(&reply)
    }
}

fn subscribe(broker: &LocalBroker, data: &Value, out: &Outbound) -> Result<(), WireError> {
    let Some(topic) = data.get("topic").and_then(Value::as_str) else {
        return out.send(&Envelope::error(TOPIC_USAGE));
    };
    let sub = match broker.subscribe(topic) {
        Ok(sub) => sub,
        Err(e) => {
            tracing::warn!(topic, error = %e, label = e.as_label(), "peer subscribe failed");
            return out.send(&Envelope::error(e.to_string()));
        }
    };
    out.send(&Envelope::info(json!({ "subscribed": topic, "id": sub.id() })))?;
    tokio::spawn(forward(sub, out.clone()));
    Ok(())
}

/// Pushes published envelopes to the peer; dropping `sub` unsubscribes.
async fn forward(mut sub: Subscription, peer: Outbound) {
    loop {
        tokio::select! {
            _ = peer.closed() => break,
            env = sub.recv() => match env {
                Some(env) if peer.send(&env).is_ok() => {}
                _ => break,
            },
        }
    }
    tracing::debug!(topic = sub.topic(), subscription = %sub.id(), "peer subscription ended");
}

#[async_trait]
impl MessageHandler for BrokerBridge {
    async fn process_message(&self, msg: Value, out: &Outbound) -> Result<(), WireError> {
        let Some(request) = msg.get("request").and_then(Value::as_str) else {
            return out.send(&Envelope::error(WRONG_FORMAT));
        };
        let data = msg.get("data").cloned().unwrap_or(Value::Null);

        match &self.topics {
            Some(broker) if request == SUBSCRIBE_REQUEST => subscribe(broker, &data, out),
            _ => self.call(request, data, out).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBroker;
    use crate::config::ProcedureConfig;
    use crate::gateway::{Echo, ProcedureGateway, ECHO_USAGE};
    use serde_json::json;

    async fn bridged() -> (BrokerBridge, LocalBroker) {
        let broker = LocalBroker::new();
        let gw = Arc::new(ProcedureGateway::new(
            ProcedureConfig::new("sampleRPC").expect("valid rpc"),
            Arc::new(Echo),
        ));
        gw.on_join(&broker).await.expect("register");
        (BrokerBridge::new(Arc::new(broker.clone())), broker)
    }

    #[tokio::test]
    async fn forwards_kwargs_and_wraps_result() {
        let (bridge, _broker) = bridged().await;
        let (out, mut rx) = Outbound::channel();

        bridge
            .process_message(json!({"request": "sampleRPC", "data": {"value": 5}}), &out)
            .await
            .expect("reply");

        assert_eq!(rx.try_recv().expect("reply").envelope(), Some(Envelope::data(5)));
    }

    #[tokio::test]
    async fn validation_errors_pass_through() {
        let (bridge, _broker) = bridged().await;
        let (out, mut rx) = Outbound::channel();

        bridge
            .process_message(json!({"request": "sampleRPC", "data": {"nope": 1}}), &out)
            .await
            .expect("reply");

        assert_eq!(
            rx.try_recv().expect("reply").envelope(),
            Some(Envelope::error(ECHO_USAGE))
        );
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn subscribe_forwards_published_envelopes_until_close() {
        let (bridge, broker) = bridged().await;
        let bridge = bridge.with_topics(broker.clone());
        let (out, mut rx) = Outbound::channel();

        bridge
            .process_message(json!({"request": "subscribe", "data": {"topic": "3"}}), &out)
            .await
            .expect("reply");

        let ack = rx.recv().await.expect("ack").envelope().expect("envelope");
        assert_eq!(ack.response, crate::envelope::Response::Info);
        assert_eq!(ack.data["subscribed"], json!("3"));
        assert_eq!(broker.subscriber_count("3"), 1);

        broker.publish("3", &Envelope::data(3.0)).await.expect("publish");
        let frame = rx.recv().await.expect("forwarded");
        assert!(frame.is_binary());
        assert_eq!(frame.envelope(), Some(Envelope::data(3.0)));

        out.close();
        wait_until(|| broker.subscriber_count("3") == 0).await;
    }

    #[tokio::test]
    async fn subscribe_requires_topic_string() {
        let (bridge, broker) = bridged().await;
        let bridge = bridge.with_topics(broker.clone());
        let (out, mut rx) = Outbound::channel();

        bridge
            .process_message(json!({"request": "subscribe", "data": {"topic": 3}}), &out)
            .await
            .expect("reply");

        assert_eq!(
            rx.try_recv().expect("reply").envelope(),
            Some(Envelope::error(TOPIC_USAGE))
        );
        assert_eq!(broker.subscriber_count("3"), 0);
    }

    #[tokio::test]
    async fn subscribe_without_topics_is_a_plain_call() {
        let (bridge, broker) = bridged().await;
        let (out, mut rx) = Outbound::channel();

        bridge
            .process_message(json!({"request": "subscribe", "data": {"topic": "3"}}), &out)
            .await
            .expect("reply");

        let reply = rx.try_recv().expect("reply").envelope().expect("envelope");
        assert_eq!(reply.data, json!("no such procedure: subscribe"));
        assert_eq!(broker.subscriber_count("3"), 0);
    }

    #[tokio::test]
    async fn unknown_procedure_is_an_error_reply() {
        let (bridge, _broker) = bridged().await;
        let (out, mut rx) = Outbound::channel();

        bridge
            .process_message(json!({"request": "missing", "data": {"value": 1}}), &out)
            .await
            .expect("reply");

        let reply = rx.try_recv().expect("reply").envelope().expect("envelope");
        assert!(reply.is_error());
        assert_eq!(reply.data, json!("no such procedure: missing"));
    }
}
