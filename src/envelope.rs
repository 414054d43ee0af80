//! # Two-field response envelope.
//!
//! Every payload that leaves a component has the same shape:
//! ```text
//! {"response": "<data|info|error>", "data": <any JSON>}
//! ```
//! Published events, procedure-validation failures and WebSocket replies all use
//! [`Envelope`]. Recoverable failures are values of this type
//! (`response == "error"`), never Rust errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response code carried in the `response` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    /// Regular payload.
    Data,
    /// Informational acknowledgement.
    Info,
    /// Terminal or validation error; `data` holds the message.
    Error,
}

impl Response {
    /// Returns the wire spelling of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Data => "data",
            Response::Info => "info",
            Response::Error => "error",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{response, data}` payload.
///
/// ```
/// use serde_json::json;
/// use socknet::{Envelope, Response};
///
/// let env = Envelope::error("Wrong message format");
/// assert_eq!(env.response, Response::Error);
/// assert_eq!(
///     serde_json::to_value(&env).unwrap(),
///     json!({"response": "error", "data": "Wrong message format"}),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub response: Response,
    pub data: Value,
}

impl Envelope {
    pub fn new(response: Response, data: impl Into<Value>) -> Self {
        Self {
            response,
            data: data.into(),
        }
    }

    #[inline]
    pub fn data(data: impl Into<Value>) -> Self {
        Self::new(Response::Data, data)
    }

    #[inline]
    pub fn info(data: impl Into<Value>) -> Self {
        Self::new(Response::Info, data)
    }

    #[inline]
    pub fn error(data: impl Into<Value>) -> Self {
        Self::new(Response::Error, data)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.response == Response::Error
    }

    /// Converts the envelope into a JSON object value.
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "response": self.response.as_str(),
            "data": self.data,
        })
    }
}
