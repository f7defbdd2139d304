use std::sync::Arc;

use super::*;

#[test]
fn test_get_miss_then_hit() {
    let cache = EmbeddingCache::new(4, true);
    assert!(cache.get("hello").is_none());

    cache.put("hello", vec![1.0, 2.0]);
    assert_eq!(cache.get("hello"), Some(vec![1.0, 2.0]));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 0);
}

#[test]
fn test_whitespace_normalization_shares_key() {
    let cache = EmbeddingCache::new(4, true);
    cache.put("hello   world", vec![0.5]);
    assert_eq!(cache.get("hello world"), Some(vec![0.5]));
}

#[test]
fn test_lru_eviction_at_capacity() {
    let cache = EmbeddingCache::new(3, true);
    cache.put("a", vec![1.0]);
    cache.put("b", vec![2.0]);
    cache.put("c", vec![3.0]);

    // N+1 distinct keys: exactly one eviction, the least-recently-used.
    cache.put("d", vec![4.0]);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.len, 3);
    assert!(cache.get("a").is_none());
    assert!(cache.get("d").is_some());
}

#[test]
fn test_hit_promotes_to_mru() {
    let cache = EmbeddingCache::new(2, true);
    cache.put("a", vec![1.0]);
    cache.put("b", vec![2.0]);

    // Touch "a" so "b" becomes the LRU entry.
    assert!(cache.get("a").is_some());
    cache.put("c", vec![3.0]);

    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());
}

#[test]
fn test_replace_same_key_is_not_eviction() {
    let cache = EmbeddingCache::new(2, true);
    cache.put("a", vec![1.0]);
    cache.put("a", vec![2.0]);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 0);
    assert_eq!(stats.len, 1);
    assert_eq!(cache.get("a"), Some(vec![2.0]));
}

#[test]
fn test_counters_reconcile() {
    let cache = EmbeddingCache::new(2, true);
    let mut gets = 0u64;

    for i in 0..5 {
        cache.put(&format!("key-{}", i), vec![i as f32]);
    }
    for i in 0..5 {
        let _ = cache.get(&format!("key-{}", i));
        gets += 1;
    }

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, gets);
    // 5 insertions into capacity 2: three evictions once capacity exceeded.
    assert_eq!(stats.evictions, 3);
}

#[test]
fn test_disabled_cache_always_misses() {
    let cache = EmbeddingCache::new(4, false);
    cache.put("a", vec![1.0]);
    assert!(cache.get("a").is_none());

    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.len, 0);
    assert!(!cache.is_enabled());
}

#[test]
fn test_hit_rate() {
    let cache = EmbeddingCache::new(4, true);
    assert_eq!(cache.stats().hit_rate(), 0.0);

    cache.put("a", vec![1.0]);
    let _ = cache.get("a");
    let _ = cache.get("b");
    assert!((cache.stats().hit_rate() - 0.5).abs() < 1e-9);
}

#[test]
fn test_concurrent_access_loses_nothing() {
    let cache = Arc::new(EmbeddingCache::new(64, true));
    let mut handles = Vec::new();

    for t in 0..4 {
        let cache = Arc::clone(&cache);
        handles.push(std::thread::spawn(move || {
            for i in 0..32 {
                let key = format!("t{}-{}", t, i);
                cache.put(&key, vec![i as f32]);
                let _ = cache.get(&key);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 128);
    assert!(stats.len <= 64);
}

#[test]
fn test_zero_capacity_clamped() {
    let cache = EmbeddingCache::new(0, true);
    cache.put("a", vec![1.0]);
    assert_eq!(cache.stats().capacity, 1);
    assert!(cache.get("a").is_some());
}
