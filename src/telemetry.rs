//! Process-wide `tracing` setup.
//!
//! `RUST_LOG` wins over the default filter passed by the caller.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<bool> = OnceLock::new();

/// Installs the fmt subscriber once; later calls are no-ops.
///
/// Returns `true` if this process' subscriber is the one installed here
/// (`false` when another global subscriber was already set).
pub fn init_logging(default_filter: &str) -> bool {
    *INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let first = init_logging("debug");
        let second = init_logging("info");
        assert_eq!(first, second);
    }
}
