//! The per-object debug-info cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use coretrace_dwarf::{Info, ObjectFile};

/// Memoises parsed [`Info`] by object identity.
///
/// Parsing debug sections is the expensive part of symbolisation; every
/// walk over the same image should share one `Info`. Entries live for the
/// cache's lifetime; there is no eviction.
pub struct DebugCache {
    entries: Mutex<HashMap<String, Arc<Info>>>,
    lookups: AtomicU64,
    hits: AtomicU64,
}

impl DebugCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            lookups: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// The debug info for `object`, parsed at most once per key.
    pub fn info_for(&self, key: &str, object: &dyn ObjectFile) -> Arc<Info> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(info) = entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return info.clone();
        }
        log::debug!("parsing debug info for {key}");
        let info = Arc::new(Info::new(object));
        entries.insert(key.to_string(), info.clone());
        info
    }

    /// (lookups, hits) since construction.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.lookups.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
        )
    }
}

impl Default for DebugCache {
    fn default() -> Self {
        Self::new()
    }
}
