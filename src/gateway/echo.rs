//! Echo sample procedure.

use async_trait::async_trait;
use serde_json::Value;

use crate::broker::Invocation;
use crate::gateway::Procedure;

/// Validation message for malformed echo calls.
pub const ECHO_USAGE: &str = r#"Expected empty list as args and "value" key in kwargs"#;

/// Returns its `value` keyword argument.
///
/// Rejects calls with positional arguments or without `value`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

#[async_trait]
impl Procedure for Echo {
    fn validate(&self, call: &Invocation) -> Result<(), String> {
        if !call.args.is_empty() || !call.kwargs.contains_key("value") {
            return Err(ECHO_USAGE.to_string());
        }
        Ok(())
    }

    async fn call(&self, mut call: Invocation) -> Value {
        call.kwargs.remove("value").unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcedureConfig;
    use crate::gateway::ProcedureGateway;
    use serde_json::json;
    use std::sync::Arc;

    fn echo_gateway() -> ProcedureGateway {
        ProcedureGateway::new(
            ProcedureConfig::new("sampleRPC").expect("valid rpc"),
            Arc::new(Echo),
        )
    }

    #[tokio::test]
    async fn echoes_value() {
        let gw = echo_gateway();
        for value in [json!("x"), json!(3), json!({"a": [1, null]}), Value::Null] {
            let out = gw.dispatch(Invocation::new().kwarg("value", value.clone())).await;
            assert_eq!(out, value);
        }
    }

    #[tokio::test]
    async fn positional_args_are_rejected() {
        let gw = echo_gateway();
        let out = gw
            .dispatch(Invocation::new().arg(1).kwarg("value", "x"))
            .await;
        assert_eq!(out, json!({"response": "error", "data": ECHO_USAGE}));
    }

    #[tokio::test]
    async fn missing_value_is_rejected() {
        let gw = echo_gateway();
        let out = gw.dispatch(Invocation::new().kwarg("other", 1)).await;
        assert_eq!(out["response"], json!("error"));
        assert_eq!(out["data"], json!(ECHO_USAGE));
    }

    #[test]
    fn usage_message_matches_wire_text() {
        assert_eq!(
            ECHO_USAGE,
            "Expected empty list as args and \"value\" key in kwargs"
        );
    }
}
