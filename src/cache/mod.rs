//! # Object caches
//!
//! Resolving a coordinate system or building a datum conversion reads
//! several dictionaries; the two caches keep the most recently used results.
//!
//! * the coordinate system cache is keyed by one key name,
//! * the datum conversion cache by the ordered `(source, target)` pair.
//!
//! Both are fixed-capacity LRU maps. A hit promotes the entry in O(1); a miss
//! at capacity evicts the least recently used entry. Values are handed out
//! as `Arc`, so an evicted object stays alive for as long as a caller still
//! holds it while the cache itself never keeps more than one object per key.

use std::{fmt, hash::Hash, num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{geoframe_errors::GeoframeError, key_name::fold_key};

/// Key of the coordinate system cache: the case-folded key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CsKey(String);

impl CsKey {
    pub fn new(name: &str) -> Self {
        CsKey(fold_key(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Key of the datum conversion cache. `(A, B)` and `(B, A)` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatumPairKey {
    pub source: String,
    pub target: String,
}

impl DatumPairKey {
    pub fn new(source: &str, target: &str) -> Self {
        DatumPairKey {
            source: fold_key(source),
            target: fold_key(target),
        }
    }
}

impl fmt::Display for DatumPairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    /// Calls to the loader (misses that reached the dictionaries).
    pub loads: u64,
    pub evictions: u64,
}

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, Arc<V>>,
    stats: CacheStats,
}

/// Fixed-capacity LRU cache of resolved objects.
pub struct ObjectCache<K: Hash + Eq, V> {
    name: &'static str,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> ObjectCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    /// Create a cache holding at most `capacity` objects (at least one).
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ObjectCache {
            name,
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Return the cached object for `key`, loading it on a miss.
    ///
    /// Load errors are returned unchanged and nothing is cached for `key`.
    /// The cache lock is held while `load` runs, so `load` must not use the
    /// same cache.
    pub fn resolve<F>(&self, key: &K, load: F) -> Result<Arc<V>, GeoframeError>
    where
        F: FnOnce(&K) -> Result<V, GeoframeError>,
    {
        let mut inner = self.inner.lock();
        if let Some(hit) = inner.entries.get(key) {
            let hit = Arc::clone(hit);
            inner.stats.hits += 1;
            trace!(cache = self.name, ?key, "cache hit");
            return Ok(hit);
        }

        let value = Arc::new(load(key)?);
        inner.stats.loads += 1;
        if let Some((evicted, _)) = inner.entries.push(key.clone(), Arc::clone(&value)) {
            if &evicted != key {
                inner.stats.evictions += 1;
                debug!(cache = self.name, ?evicted, "evicted least recently used entry");
            }
        }
        Ok(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    /// Drop every entry. Objects still held by callers stay alive.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let released = inner.entries.len();
        inner.entries.clear();
        debug!(cache = self.name, released, "cache cleared");
    }
}
