//! LRU cache for completed triple-match results.
//!
//! Sits in front of the whole compile+execute path, keyed by the
//! canonical text of the match request, so a repeated request costs one
//! lookup instead of a compilation and a round trip. Entries are inserted
//! only when a stream was drained to completion; cancelled or failed runs
//! never populate the cache. Callers that mutate the underlying database
//! out of band invalidate explicitly with [`FindCache::clear`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use oxrdf::Triple;

/// Cache sizing and switches.
///
/// Environment variables:
/// - `RDFBRIDGE_RESULT_CACHE_ENABLED` (default: true)
/// - `RDFBRIDGE_RESULT_CACHE_MAX_ENTRIES` (default: 10000)
#[derive(Debug, Clone)]
pub struct FindCacheConfig {
    pub enabled: bool,
    /// Maximum number of cached requests (LRU eviction).
    pub max_entries: usize,
}

impl Default for FindCacheConfig {
    fn default() -> Self {
        FindCacheConfig {
            enabled: true,
            max_entries: 10_000,
        }
    }
}

impl FindCacheConfig {
    pub fn from_env() -> Self {
        let enabled = std::env::var("RDFBRIDGE_RESULT_CACHE_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);
        let max_entries = std::env::var("RDFBRIDGE_RESULT_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        FindCacheConfig {
            enabled,
            max_entries,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    triples: Arc<Vec<Triple>>,
    /// Logical recency tick; a counter rather than wall-clock time so
    /// same-second accesses still order.
    last_accessed: u64,
}

/// Result cache with LRU eviction and hit/miss/eviction counters.
#[derive(Debug)]
pub struct FindCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    config: FindCacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl FindCache {
    pub fn new(config: FindCacheConfig) -> Self {
        FindCache {
            entries: Arc::new(Mutex::new(HashMap::new())),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FindCacheConfig::default())
    }

    pub fn from_env() -> Self {
        Self::new(FindCacheConfig::from_env())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<Triple>>> {
        if !self.config.enabled {
            return None;
        }
        let tick = self.tick();
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(entry) = entries.get_mut(key) {
            entry.last_accessed = tick;
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(&entry.triples))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn insert(&self, key: String, triples: Vec<Triple>) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }
        let tick = self.tick();
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            if let Some(lru) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&lru);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                triples: Arc::new(triples),
                last_accessed: tick,
            },
        );
    }

    /// Drop everything; the entry point for out-of-band mutators.
    pub fn clear(&self) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let size = match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
            max_entries: self.config.max_entries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
