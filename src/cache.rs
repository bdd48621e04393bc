//! Bounded LRU cache for rewritten queries.
//!
//! Keyed by the exact original query text. Rewriting is deterministic, so an
//! entry never goes stale; eviction happens only under capacity pressure or
//! an explicit [`QueryCache::clear`].

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::translate::Rewritten;

/// Default number of cached translations.
pub const DEFAULT_CAPACITY: usize = 500;

/// Shared, bounded query-translation cache with hit/miss accounting.
///
/// All operations take the internal lock for their full duration, so
/// concurrent callers never observe a size above capacity or a half-applied
/// eviction. Counters are atomics and survive `clear`.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<LruCache<String, Arc<Rewritten>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).expect("cache capacity must be > 0");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a query text. A hit promotes the entry to most-recently-used.
    pub fn get(&self, query: &str) -> Option<Arc<Rewritten>> {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        match entries.get(query) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite the translation for a query text. Inserting a new
    /// key at capacity evicts exactly the least-recently-used entry;
    /// overwriting promotes without changing the size.
    pub fn put(&self, query: impl Into<String>, entry: Arc<Rewritten>) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        entries.put(query.into(), entry);
    }

    /// Drop every entry. Hit/miss counters are unaffected.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("query cache lock poisoned");
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("query cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .lock()
            .expect("query cache lock poisoned")
            .cap()
            .get()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Zero the hit/miss counters. Entries are untouched.
    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
