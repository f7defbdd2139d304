//! Content-hash-keyed LRU cache for computed embeddings.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::trace;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

struct CacheInner {
    lru: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Bounded LRU cache mapping text to a previously computed embedding.
///
/// Keys are SHA-256 hashes of the whitespace-normalized text, so the
/// plaintext is never stored twice and key size stays constant. One mutex
/// guards the whole check/evict/insert sequence; splitting read and write
/// locks can race on the eviction order.
pub struct EmbeddingCache {
    enabled: bool,
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize, enabled: bool) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            enabled,
            capacity: cap.get(),
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(cap),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Look up a cached embedding. A hit promotes the entry to
    /// most-recently-used. When the cache is disabled every lookup misses.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::key(text);
        let mut inner = self.inner.lock();
        if !self.enabled {
            inner.misses += 1;
            return None;
        }
        match inner.lru.get(&key) {
            Some(vector) => {
                let vector = vector.clone();
                inner.hits += 1;
                trace!(key = %key, "embedding cache hit");
                Some(vector)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert an embedding, evicting the least-recently-used entry if the
    /// cache is at capacity. A no-op when disabled.
    pub fn put(&self, text: &str, vector: Vec<f32>) {
        if !self.enabled {
            return;
        }
        let key = Self::key(text);
        let mut inner = self.inner.lock();
        if let Some((evicted_key, _)) = inner.lru.push(key.clone(), vector) {
            // push returns the displaced LRU pair, or the old value under
            // the same key on replacement. Only the former is an eviction.
            if evicted_key != key {
                inner.evictions += 1;
                trace!(key = %evicted_key, "evicted least-recently-used embedding");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            len: inner.lru.len(),
            capacity: self.capacity,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn key(text: &str) -> String {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let digest = Sha256::digest(normalized.as_bytes());
        format!("{:x}", digest)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
