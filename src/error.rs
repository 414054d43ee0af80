//! Error types used by socknet components.
//!
//! Failures fall into three classes:
//!
//! - **construction-time**: [`ConfigError`], the component refuses to start;
//! - **runtime-fatal**: [`ControllerError`], a broken broker contract (e.g. a
//!   delete meta-event for an id that was never created) that must not be
//!   recovered from;
//! - **recoverable**: malformed arguments, malformed frames, failing event
//!   sources. These are *not* Rust errors; they travel as
//!   [`Envelope::error`](crate::Envelope::error) payloads.
//!
//! [`SessionError`] and [`WireError`] describe failures of the broker session and
//! of the WebSocket peer; [`RuntimeError`] covers shutdown.
//!
//! Every enum provides `as_label()` returning a short stable snake_case label
//! for logs.

use std::time::Duration;

use thiserror::Error;

use crate::broker::SubscriptionId;

/// # Invalid component configuration.
///
/// Raised by [`PublishConfig`](crate::PublishConfig) and
/// [`ProcedureConfig`](crate::ProcedureConfig) before any broker interaction.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required key is absent.
    #[error("missing required config key `{key}`")]
    Missing {
        /// Config key name.
        key: &'static str,
    },

    /// A key is present but has the wrong JSON type.
    #[error("config key `{key}` must be {expected}")]
    WrongType {
        /// Config key name.
        key: &'static str,
        /// Human-readable expected type.
        expected: &'static str,
    },

    /// A key has the right type but an unusable value.
    #[error("config key `{key}` is invalid: {reason}")]
    Invalid {
        /// Config key name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use socknet::ConfigError;
    ///
    /// let err = ConfigError::Missing { key: "interval" };
    /// assert_eq!(err.as_label(), "config_missing");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Missing { .. } => "config_missing",
            ConfigError::WrongType { .. } => "config_wrong_type",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }

    /// Returns the offending config key.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigError::Missing { key }
            | ConfigError::WrongType { key, .. }
            | ConfigError::Invalid { key, .. } => key,
        }
    }
}

/// # Failures of broker session primitives.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session is closed; no further calls are possible.
    #[error("broker session closed")]
    Closed,

    /// `call` targeted a procedure nobody registered.
    #[error("no such procedure: {0}")]
    NoSuchProcedure(String),

    /// `register` targeted a name that already has a callee.
    #[error("procedure already registered: {0}")]
    AlreadyRegistered(String),

    /// Transport-level failure reported by a broker integration.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SessionError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::Closed => "session_closed",
            SessionError::NoSuchProcedure(_) => "session_no_such_procedure",
            SessionError::AlreadyRegistered(_) => "session_already_registered",
            SessionError::Transport(_) => "session_transport",
        }
    }
}

/// # Fatal faults of the publish lifecycle controller.
///
/// Any of these ends the meta-event listener; none is recovered internally.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// A delete meta-event named an id that is not active: the broker violated
    /// "delete only follows a prior create for the same id".
    #[error("inconsistent meta-event ordering: subscription {id} deleted but never active")]
    UnknownSubscription {
        /// Offending subscription id.
        id: SubscriptionId,
    },

    /// The meta-event stream ended while the controller was running.
    #[error("meta-event stream closed")]
    MetaStreamClosed,

    /// A broker primitive failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ControllerError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use socknet::{ControllerError, SubscriptionId};
    ///
    /// let err = ControllerError::UnknownSubscription { id: SubscriptionId::new(7) };
    /// assert_eq!(err.as_label(), "controller_unknown_subscription");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ControllerError::UnknownSubscription { .. } => "controller_unknown_subscription",
            ControllerError::MetaStreamClosed => "controller_meta_stream_closed",
            ControllerError::Session(e) => e.as_label(),
        }
    }
}

/// # Failures of outbound WebSocket sends.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WireError {
    /// The peer's outbound queue is gone (connection closed).
    #[error("peer connection closed")]
    Closed,

    /// The envelope could not be serialized.
    #[error("failed to encode envelope")]
    Encode(#[source] serde_json::Error),
}

impl WireError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WireError::Closed => "wire_closed",
            WireError::Encode(_) => "wire_encode",
        }
    }
}

/// # Errors produced while stopping the runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Emission tasks did not stop within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Subscriptions whose emission tasks were still running.
        stuck: Vec<SubscriptionId>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exposes_key() {
        let err = ConfigError::WrongType {
            key: "rpc",
            expected: "a string",
        };
        assert_eq!(err.key(), "rpc");
        assert_eq!(err.to_string(), "config key `rpc` must be a string");
    }

    #[test]
    fn controller_error_wraps_session_label() {
        let err = ControllerError::from(SessionError::Closed);
        assert_eq!(err.as_label(), "session_closed");
        assert_eq!(err.to_string(), "broker session closed");
    }

    #[test]
    fn unknown_subscription_mentions_id() {
        let err = ControllerError::UnknownSubscription {
            id: SubscriptionId::new(42),
        };
        assert!(err.to_string().contains("42"));
    }
}
