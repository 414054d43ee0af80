//! # Component configuration.
//!
//! Configuration is validated **once**, at construction, into strongly typed
//! structs; nothing downstream re-checks types.
//!
//! - [`PublishConfig`] - the `interval` between emissions of a publish component;
//! - [`ProcedureConfig`] - the `rpc` name a procedure component registers;
//! - [`RuntimeConfig`] - runtime knobs shared by components (shutdown grace, bus size).
//!
//! Publish and procedure configs can be read from a broker session's "extra"
//! JSON map:
//! ```
//! use serde_json::json;
//! use socknet::{ProcedureConfig, PublishConfig};
//!
//! let publish = PublishConfig::from_extra(&json!({"interval": 10})).unwrap();
//! assert_eq!(publish.interval().as_secs(), 10);
//!
//! let rpc = ProcedureConfig::from_extra(&json!({"rpc": "sampleRPC"})).unwrap();
//! assert_eq!(rpc.rpc(), "sampleRPC");
//!
//! assert!(PublishConfig::from_extra(&json!({"interval": "10"})).is_err());
//! ```

use std::time::Duration;

use serde_json::Value;

use crate::error::ConfigError;

const INTERVAL_KEY: &str = "interval";
const RPC_KEY: &str = "rpc";

/// Validated configuration of a publish component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PublishConfig {
    interval: Duration,
}

impl PublishConfig {
    /// Builds a config from an interval in seconds.
    ///
    /// Fails if `secs` is not finite or not strictly positive.
    pub fn new(secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::Invalid {
                key: INTERVAL_KEY,
                reason: format!("expected a positive number of seconds, got {secs}"),
            });
        }
        Duration::try_from_secs_f64(secs)
            .map(|interval| Self { interval })
            .map_err(|e| ConfigError::Invalid {
                key: INTERVAL_KEY,
                reason: e.to_string(),
            })
    }

    /// Reads `interval` from a session "extra" map.
    ///
    /// The key must be present and a JSON number; strings holding digits are rejected.
    pub fn from_extra(extra: &Value) -> Result<Self, ConfigError> {
        let raw = extra
            .get(INTERVAL_KEY)
            .filter(|v| !v.is_null())
            .ok_or(ConfigError::Missing { key: INTERVAL_KEY })?;
        let secs = raw.as_f64().ok_or(ConfigError::WrongType {
            key: INTERVAL_KEY,
            expected: "a number",
        })?;
        Self::new(secs)
    }

    /// Time between two emissions to the same subscription.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Validated configuration of a procedure component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcedureConfig {
    rpc: String,
}

impl ProcedureConfig {
    /// Builds a config for the given procedure name (must not be blank).
    pub fn new(rpc: impl Into<String>) -> Result<Self, ConfigError> {
        let rpc = rpc.into();
        if rpc.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: RPC_KEY,
                reason: "procedure name must not be empty".to_string(),
            });
        }
        Ok(Self { rpc })
    }

    /// Reads `rpc` from a session "extra" map.
    pub fn from_extra(extra: &Value) -> Result<Self, ConfigError> {
        let raw = extra
            .get(RPC_KEY)
            .filter(|v| !v.is_null())
            .ok_or(ConfigError::Missing { key: RPC_KEY })?;
        let rpc = raw.as_str().ok_or(ConfigError::WrongType {
            key: RPC_KEY,
            expected: "a string",
        })?;
        Self::new(rpc)
    }

    /// Procedure name registered with the broker.
    #[inline]
    pub fn rpc(&self) -> &str {
        &self.rpc
    }
}

/// Runtime settings shared by components.
///
/// ## Field semantics
/// - `grace`: maximum wait for emission tasks to stop on shutdown (`0s` = do not wait)
/// - `bus_capacity`: lifecycle event bus ring buffer size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Maximum time to wait for emission tasks during shutdown.
    pub grace: Duration,

    /// Capacity of the lifecycle event bus.
    ///
    /// Observers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,
}

impl RuntimeConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RuntimeConfig {
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_accepts_integers_and_floats() {
        for raw in [json!(10), json!(0.01), json!(2.5)] {
            let cfg = PublishConfig::from_extra(&json!({ "interval": raw })).expect("valid");
            assert!(cfg.interval() > Duration::ZERO);
        }
        let cfg = PublishConfig::from_extra(&json!({"interval": 0.01})).expect("valid");
        assert_eq!(cfg.interval(), Duration::from_millis(10));
    }

    #[test]
    fn publish_rejects_missing_interval() {
        let err = PublishConfig::from_extra(&json!({})).expect_err("missing");
        assert_eq!(err, ConfigError::Missing { key: "interval" });

        let err = PublishConfig::from_extra(&json!({"interval": null})).expect_err("null");
        assert_eq!(err.as_label(), "config_missing");
    }

    #[test]
    fn publish_rejects_non_numeric_interval() {
        for raw in [json!("10"), json!(true), json!([1]), json!({"secs": 1})] {
            let err = PublishConfig::from_extra(&json!({ "interval": raw })).expect_err("type");
            assert_eq!(err.as_label(), "config_wrong_type");
        }
    }

    #[test]
    fn publish_rejects_non_positive_interval() {
        assert!(PublishConfig::new(0.0).is_err());
        assert!(PublishConfig::new(-1.0).is_err());
        assert!(PublishConfig::new(f64::NAN).is_err());
        assert!(PublishConfig::new(f64::INFINITY).is_err());
    }

    #[test]
    fn procedure_requires_non_empty_string() {
        assert_eq!(
            ProcedureConfig::from_extra(&json!({})).expect_err("missing"),
            ConfigError::Missing { key: "rpc" }
        );
        assert_eq!(
            ProcedureConfig::from_extra(&json!({"rpc": 5}))
                .expect_err("type")
                .as_label(),
            "config_wrong_type"
        );
        assert_eq!(
            ProcedureConfig::new("  ").expect_err("blank").as_label(),
            "config_invalid"
        );
        assert_eq!(ProcedureConfig::new("echo").expect("ok").rpc(), "echo");
    }

    #[test]
    fn runtime_defaults_and_clamp() {
        let mut cfg = RuntimeConfig::default();
        assert_eq!(cfg.grace, Duration::from_secs(5));
        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
