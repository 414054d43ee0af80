//! # Event sources.
//!
//! An [`EventSource`] produces the next `{response, data}` payload for one topic
//! key. A [`SourceFactory`] builds sources on demand, and [`SourceMap`] keeps one
//! instance per key for the lifetime of the process.
//!
//! ```text
//! SourceMap::fetch("3")
//!     ├─ cached? ── yes ──► source.fetch()
//!     └─ no ──► factory.create("3")
//!                  ├─ Ok(source) ──► cache, source.fetch()
//!                  └─ Err(env)   ──► env (nothing cached)
//! ```
//!
//! Sources answer with `response == "error"` to end emission for the current
//! key; the source itself stays cached.

mod multi_table;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::envelope::Envelope;

pub use multi_table::{MultiTable, MultiTableSource, NOT_A_NUMBER, OUT_OF_RANGE};

/// Sequenced producer of payloads for one topic key.
///
/// Each `fetch` advances internal sequencing state by exactly one step; the
/// first call after creation already reflects one step.
pub trait EventSource: Send + 'static {
    fn fetch(&mut self) -> Envelope;
}

/// Builds an [`EventSource`] for a topic key.
///
/// Returning `Err(envelope)` rejects the key; the envelope (normally an
/// `error` payload) is handed to the caller in place of an event.
pub trait SourceFactory: Send + Sync + 'static {
    fn create(&self, key: &str) -> Result<Box<dyn EventSource>, Envelope>;
}

impl<F> SourceFactory for F
where
    F: Fn(&str) -> Result<Box<dyn EventSource>, Envelope> + Send + Sync + 'static,
{
    fn create(&self, key: &str) -> Result<Box<dyn EventSource>, Envelope> {
        self(key)
    }
}

/// Lazily populated, keyed collection of event sources.
///
/// **Unbounded**: a source created for a key is never evicted, so memory grows
/// with the number of distinct keys ever fetched. Eviction would reset the
/// key's sequencing state.
pub struct SourceMap {
    factory: Arc<dyn SourceFactory>,
    sources: Mutex<HashMap<String, Box<dyn EventSource>>>,
}

impl SourceMap {
    pub fn new(factory: Arc<dyn SourceFactory>) -> Self {
        Self {
            factory,
            sources: Mutex::new(HashMap::new()),
        }
    }

    /// Next payload for `key`, creating its source on first use.
    pub fn fetch(&self, key: &str) -> Envelope {
        let mut sources = self.sources.lock();
        if let Some(source) = sources.get_mut(key) {
            return source.fetch();
        }
        match self.factory.create(key) {
            Ok(mut source) => {
                let env = source.fetch();
                sources.insert(key.to_string(), source);
                env
            }
            Err(rejected) => rejected,
        }
    }

    /// Number of cached sources.
    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sources.lock().contains_key(key)
    }
}

impl std::fmt::Debug for SourceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceMap").field("cached", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter(u64);

    impl EventSource for Counter {
        fn fetch(&mut self) -> Envelope {
            self.0 += 1;
            Envelope::data(self.0)
        }
    }

    fn counters() -> Arc<dyn SourceFactory> {
        Arc::new(|key: &str| -> Result<Box<dyn EventSource>, Envelope> {
            if key == "bad" {
                Err(Envelope::error("rejected"))
            } else {
                Ok(Box::new(Counter(0)))
            }
        })
    }

    #[test]
    fn sources_are_created_lazily_and_kept() {
        let map = SourceMap::new(counters());
        assert!(map.is_empty());

        assert_eq!(map.fetch("a").data, json!(1));
        assert_eq!(map.fetch("a").data, json!(2));
        assert!(map.contains("a"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn keys_do_not_share_state() {
        let map = SourceMap::new(counters());
        map.fetch("a");
        map.fetch("a");
        assert_eq!(map.fetch("b").data, json!(1));
    }

    #[test]
    fn rejected_keys_are_not_cached() {
        let map = SourceMap::new(counters());
        let env = map.fetch("bad");
        assert!(env.is_error());
        assert!(!map.contains("bad"));
        assert!(map.is_empty());
    }
}
