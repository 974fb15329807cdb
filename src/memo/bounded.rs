//! Bounded LRU store. A hit promotes the key; inserting a new key at capacity
//! evicts exactly the least recently used one, under the same lock.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::keyed::CacheStore;

/// Default capacity for `memoize_lru`.
pub const DEFAULT_LRU_SIZE: usize = 100;

pub struct BoundedCache<K, V> {
    inner: Mutex<LruCache<K, V>>,
    evictions: AtomicU64,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// A capacity of zero is treated as one.
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    /// Number of entries pushed out by capacity pressure so far.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }
}

impl<K: Hash + Eq + Clone, V> BoundedCache<K, V> {
    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.inner.lock().iter().rev().map(|(k, _)| k.clone()).collect()
    }
}

impl<K: Hash + Eq, V: Clone> CacheStore<K, V> for BoundedCache<K, V> {
    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    fn insert(&self, key: K, value: V) {
        let mut cache = self.inner.lock();
        let replacing = cache.contains(&key);
        if cache.push(key, value).is_some() && !replacing {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(capacity = cache.cap().get(), "lru_evicted");
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = BoundedCache::new(2);
        cache.insert('a', 1);
        cache.insert('b', 2);
        cache.insert('c', 3);

        assert!(!cache.contains(&'a'));
        assert_eq!(cache.keys_by_recency(), vec!['b', 'c']);
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn hit_promotes_key() {
        let cache = BoundedCache::new(2);
        cache.insert('a', 1);
        cache.insert('b', 2);
        assert_eq!(cache.get(&'a'), Some(1));
        cache.insert('c', 3);

        assert!(cache.contains(&'a'));
        assert!(!cache.contains(&'b'));
        assert_eq!(cache.keys_by_recency(), vec!['a', 'c']);
    }

    #[test]
    fn overwrite_is_not_an_eviction() {
        let cache = BoundedCache::new(2);
        cache.insert('a', 1);
        cache.insert('b', 2);
        cache.insert('a', 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.evictions(), 0);
        assert_eq!(cache.get(&'a'), Some(10));
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(1, "one");
        cache.insert(2, "two");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some("two"));
    }
}
