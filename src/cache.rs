//! The metadata result cache (§4.6): TTL + LRU eviction, keyed on
//! `(provider, id)`. Positive and negative (not-found) results share the
//! same map so repeated misses are damped too.
//!
//! Grounded on the teacher's `mcp::manager::search_cache` (TTL tracking,
//! hit/miss/eviction counters, `shutdown`/`clear`/`stats`), but capacity
//! eviction here uses the `lru` crate directly instead of hand-rolled
//! atomic-timestamp LRU tracking, since this cache has no lock-free
//! requirement — callers already hold a concurrency slot by the time they
//! write to it (§4.7.1's coalescing barrier), so lock contention on a write
//! is not the hot path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::model::Metadata;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub provider: String,
    pub id: String,
}

#[derive(Debug, Clone)]
enum CachedValue {
    Found(Metadata),
    NotFound,
}

struct Entry {
    value: CachedValue,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

pub struct MetadataCache {
    inner: Mutex<LruCache<CacheKey, Entry>>,
    ttl: Duration,
    counters: Counters,
}

impl MetadataCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).expect("capacity.max(1) is never zero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            counters: Counters {
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            },
        }
    }

    /// Returns `Some(metadata)` on a positive hit; `None` on a negative hit
    /// or an outright miss (the distinction is invisible to callers, as
    /// §4.6 specifies — both mean "don't return a record").
    #[must_use]
    pub fn try_get(&self, provider: &str, id: &str) -> Option<Metadata> {
        let key = CacheKey {
            provider: provider.to_string(),
            id: id.to_string(),
        };
        let mut guard = self.inner.lock();
        match guard.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                match &entry.value {
                    CachedValue::Found(m) => Some(m.clone()),
                    CachedValue::NotFound => None,
                }
            }
            Some(_) => {
                guard.pop(&key);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether a key is present (positive or negative) and unexpired,
    /// without affecting LRU recency or hit/miss counters. Used by the
    /// orchestrator's coalescing barrier where only presence matters.
    #[must_use]
    pub fn contains_fresh(&self, provider: &str, id: &str) -> bool {
        let key = CacheKey {
            provider: provider.to_string(),
            id: id.to_string(),
        };
        let guard = self.inner.lock();
        guard
            .peek(&key)
            .is_some_and(|e| e.inserted_at.elapsed() <= self.ttl)
    }

    pub fn put(&self, provider: &str, id: &str, value: Option<Metadata>) {
        let key = CacheKey {
            provider: provider.to_string(),
            id: id.to_string(),
        };
        let value = match value {
            Some(m) => CachedValue::Found(m),
            None => CachedValue::NotFound,
        };
        let mut guard = self.inner.lock();
        let was_full = guard.len() == guard.cap().get() && !guard.contains(&key);
        guard.put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        if was_full {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn remove(&self, provider: &str, id: &str) {
        let key = CacheKey {
            provider: provider.to_string(),
            id: id.to_string(),
        };
        self.inner.lock().pop(&key);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}
