//! Bounded recency cache.
//!
//! Fixed capacity with strict least-recently-used eviction. Generic over key
//! and value and free of domain knowledge; callers build the keys. Instances
//! are owned by whichever component memoizes, never shared globally.

pub mod keys;
pub mod timeline_caches;

pub use keys::{FilterCacheKey, LayoutCacheKey, TimeScaleKey};
pub use timeline_caches::{CacheCapacities, CacheStats, TimelineCaches};

use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Capacity used when zero is requested.
pub const DEFAULT_CAPACITY: usize = 100;

/// LRU cache with O(1) amortized `get`/`set`.
///
/// `get` promotes the entry to most-recently-used. `set` evicts exactly one
/// entry, the least recently used at that moment, when the insertion would
/// exceed capacity.
pub struct RecencyCache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
}

impl<K: Hash + Eq, V> RecencyCache<K, V> {
    /// Create new cache with given capacity.
    ///
    /// If capacity is 0, uses [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a value, promoting it to most-recently-used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Insert or replace a value, making it most-recently-used.
    ///
    /// Returns the evicted entry if the insertion pushed one out. Replacing
    /// an existing key never evicts.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.entries.contains(&key) {
            self.entries.put(key, value);
            return None;
        }
        let evicted = self.entries.push(key, value);
        if evicted.is_some() {
            tracing::trace!(capacity = self.capacity(), "recency cache evicted an entry");
        }
        evicted
    }

    /// Presence test. Does not change recency.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains(key)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries before eviction.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl<K: Hash + Eq, V> Default for RecencyCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for RecencyCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyCache")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}
