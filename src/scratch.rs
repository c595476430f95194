//! Device-local scratch state
//!
//! A small persistent float-keyed store, scoped per app install and never
//! synced. The engine uses a single key: the cumulative sensor reading
//! observed at the start of the current attribution window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key under which the step baseline is persisted
pub const BASELINE_KEY: &str = "baseline_cumulative_steps";

/// Persistent float-keyed store on the device
pub trait ScratchStore {
    fn get(&self, key: &str) -> Option<f64>;
    fn put(&self, key: &str, value: f64);
    fn remove(&self, key: &str);
}

/// In-memory scratch store.
///
/// Clones share the same underlying map, which lets tests simulate a process
/// restart: build a second engine over a clone and the persisted baseline
/// survives.
#[derive(Debug, Clone, Default)]
pub struct MemoryScratch {
    values: Arc<Mutex<HashMap<String, f64>>>,
}

impl MemoryScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScratchStore for MemoryScratch {
    fn get(&self, key: &str) -> Option<f64> {
        self.values.lock().unwrap().get(key).copied()
    }

    fn put(&self, key: &str, value: f64) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_put_get_remove() {
        let scratch = MemoryScratch::new();
        assert_eq!(scratch.get(BASELINE_KEY), None);

        scratch.put(BASELINE_KEY, 1200.0);
        assert_eq!(scratch.get(BASELINE_KEY), Some(1200.0));

        scratch.remove(BASELINE_KEY);
        assert_eq!(scratch.get(BASELINE_KEY), None);
    }

    #[test]
    fn test_clones_share_values() {
        let scratch = MemoryScratch::new();
        let other = scratch.clone();
        scratch.put(BASELINE_KEY, 42.0);
        assert_eq!(other.get(BASELINE_KEY), Some(42.0));
    }
}
