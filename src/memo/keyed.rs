//! Unbounded keyed cache: the storage primitive behind every memoizer and the
//! translation cache. Grows without limit; callers bound the key domain.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

/// Storage backend a memoizer reads from and writes to.
pub trait CacheStore<K, V> {
    /// Look up a value, counting as a use for recency-aware stores.
    fn get(&self, key: &K) -> Option<V>;

    /// Store a value. Bounded stores may evict another key to make room.
    fn insert(&self, key: K, value: V);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// Thread-safe map from key to a previously computed value.
pub struct KeyedCache<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> KeyedCache<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for KeyedCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V: Clone> KeyedCache<K, V> {
    /// Cached value for `key`, cloned out so the lock is never held by callers.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Insert or overwrite. Returns the previous value, if any.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Drop a single key.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<K: Hash + Eq, V: Clone> CacheStore<K, V> for KeyedCache<K, V> {
    fn get(&self, key: &K) -> Option<V> {
        KeyedCache::get(self, key)
    }

    fn insert(&self, key: K, value: V) {
        KeyedCache::insert(self, key, value);
    }

    fn len(&self) -> usize {
        KeyedCache::len(self)
    }

    fn clear(&self) {
        KeyedCache::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let cache: KeyedCache<String, u32> = KeyedCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.insert("a".into(), 1), None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let cache = KeyedCache::new();
        cache.insert(7u8, "x");
        assert_eq!(cache.insert(7u8, "y"), Some("x"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&7), Some("y"));
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = KeyedCache::new();
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert_eq!(cache.invalidate(&1), Some(10));
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        cache.clear();
        assert!(cache.is_empty());
    }
}
