//! Memoization strategies over a shared cache primitive.
//!
//! A [`Memoizer`] pairs a function with a key derivation strategy and a
//! [`CacheStore`]. The four constructors cover the supported combinations:
//!
//! - [`memoize`]: the argument itself is the key, unbounded.
//! - [`memoize_complex`]: the argument tuple serialized to JSON is the key.
//! - [`memoize_with_key_fn`]: a caller-supplied function derives the key.
//! - [`memoize_lru`]: like `memoize`, capped at `max_size` with LRU eviction.
//!
//! Wrapped functions are assumed pure. A cache hit skips the call entirely,
//! so side effects of an impure function are not repeated.
//!
//! Unbounded variants never shrink. They are only safe when the argument
//! domain is small; otherwise use [`memoize_lru`].
//!
//! Nothing is cached when the function panics or, through
//! [`Memoizer::try_call`], returns `Err`; the next call runs it again.
//! Functions returning `Result` should always be driven through `try_call`:
//! [`Memoizer::call`] stores whatever comes back, `Err` included.

pub mod bounded;
pub mod keyed;

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::warn;

pub use bounded::{BoundedCache, DEFAULT_LRU_SIZE};
pub use keyed::{CacheStore, KeyedCache};

/// Maps a function's arguments to a cache key.
///
/// Returning `None` bypasses the cache for that call.
pub trait KeyStrategy<A> {
    type Key;

    fn derive(&self, args: &A) -> Option<Self::Key>;
}

/// The argument is its own key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<A: Clone> KeyStrategy<A> for Identity {
    type Key = A;

    fn derive(&self, args: &A) -> Option<A> {
        Some(args.clone())
    }
}

/// JSON serialization of the full argument tuple.
///
/// Struct fields serialize in declaration order, so equal structs always
/// produce equal keys. `HashMap` arguments serialize in iteration order and
/// can produce different keys for equal maps, which shows up as missed hits;
/// prefer `BTreeMap` in memoized signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serialized;

impl<A: Serialize> KeyStrategy<A> for Serialized {
    type Key = String;

    fn derive(&self, args: &A) -> Option<String> {
        match serde_json::to_string(args) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "memo_key_unserializable, bypassing cache");
                None
            }
        }
    }
}

/// Key computed by a caller-supplied function.
#[derive(Debug, Clone, Copy)]
pub struct KeyFn<KF>(pub KF);

impl<A, K, KF> KeyStrategy<A> for KeyFn<KF>
where
    KF: Fn(&A) -> K,
{
    type Key = K;

    fn derive(&self, args: &A) -> Option<K> {
        Some((self.0)(args))
    }
}

/// Hit/miss counters for a memoizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// A function wrapped with a cache.
///
/// `A` is the argument (use a tuple for several), `V` the return type.
pub struct Memoizer<A, V, F, S, C> {
    func: F,
    strategy: S,
    store: C,
    hits: AtomicU64,
    misses: AtomicU64,
    _marker: PhantomData<fn(A) -> V>,
}

pub type Memoize<A, V, F> = Memoizer<A, V, F, Identity, KeyedCache<A, V>>;
pub type MemoizeComplex<A, V, F> = Memoizer<A, V, F, Serialized, KeyedCache<String, V>>;
pub type MemoizeWithKeyFn<A, K, V, F, KF> = Memoizer<A, V, F, KeyFn<KF>, KeyedCache<K, V>>;
pub type MemoizeLru<A, V, F> = Memoizer<A, V, F, Identity, BoundedCache<A, V>>;

impl<A, V, F, S, C> Memoizer<A, V, F, S, C>
where
    S: KeyStrategy<A>,
    C: CacheStore<S::Key, V>,
{
    /// Combine a function, key strategy and store by hand.
    pub fn new(func: F, strategy: S, store: C) -> Self {
        Self {
            func,
            strategy,
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.store.len(),
        }
    }

    fn lookup(&self, args: &A) -> Lookup<S::Key, V> {
        let Some(key) = self.strategy.derive(args) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Lookup::Bypass;
        };
        match self.store.get(&key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Hit(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss(key)
            }
        }
    }
}

enum Lookup<K, V> {
    Hit(V),
    Miss(K),
    Bypass,
}

impl<A, V, F, S, C> Memoizer<A, V, F, S, C>
where
    F: Fn(A) -> V,
    V: Clone,
    S: KeyStrategy<A>,
    C: CacheStore<S::Key, V>,
{
    /// Return the cached value for `args`, computing and storing it on a miss.
    ///
    /// The store lock is not held while the function runs, so two threads
    /// missing on the same key may both compute it; the last write wins.
    ///
    /// The return value is stored as is. For a function returning `Result`
    /// that includes `Err`, which would then be replayed on every later call;
    /// use [`try_call`](Self::try_call) for those.
    pub fn call(&self, args: A) -> V {
        match self.lookup(&args) {
            Lookup::Hit(value) => value,
            Lookup::Miss(key) => {
                let value = (self.func)(args);
                self.store.insert(key, value.clone());
                value
            }
            Lookup::Bypass => (self.func)(args),
        }
    }
}

impl<A, T, E, F, S, C> Memoizer<A, Result<T, E>, F, S, C>
where
    F: Fn(A) -> Result<T, E>,
    Result<T, E>: Clone,
    S: KeyStrategy<A>,
    C: CacheStore<S::Key, Result<T, E>>,
{
    /// Like [`call`](Self::call) for fallible functions: only `Ok` values are
    /// stored, so a failing key is retried on the next call.
    pub fn try_call(&self, args: A) -> Result<T, E> {
        match self.lookup(&args) {
            Lookup::Hit(value) => value,
            Lookup::Miss(key) => {
                let result = (self.func)(args);
                if result.is_ok() {
                    self.store.insert(key, result.clone());
                }
                result
            }
            Lookup::Bypass => (self.func)(args),
        }
    }
}

/// Memoize on the argument itself. Unbounded.
///
/// Fallible functions: call through [`Memoizer::try_call`] so `Err` is not cached.
pub fn memoize<A, V, F>(func: F) -> Memoize<A, V, F>
where
    F: Fn(A) -> V,
    A: Hash + Eq + Clone,
    V: Clone,
{
    Memoizer::new(func, Identity, KeyedCache::new())
}

/// Memoize on the JSON serialization of the argument tuple. Unbounded.
///
/// Fallible functions: call through [`Memoizer::try_call`] so `Err` is not cached.
pub fn memoize_complex<A, V, F>(func: F) -> MemoizeComplex<A, V, F>
where
    F: Fn(A) -> V,
    A: Serialize,
    V: Clone,
{
    Memoizer::new(func, Serialized, KeyedCache::new())
}

/// Memoize on whatever `key_fn` returns. Unbounded.
///
/// Fallible functions: call through [`Memoizer::try_call`] so `Err` is not cached.
pub fn memoize_with_key_fn<A, K, V, F, KF>(func: F, key_fn: KF) -> MemoizeWithKeyFn<A, K, V, F, KF>
where
    F: Fn(A) -> V,
    KF: Fn(&A) -> K,
    K: Hash + Eq,
    V: Clone,
{
    Memoizer::new(func, KeyFn(key_fn), KeyedCache::new())
}

/// Memoize on the argument itself, keeping at most `max_size` entries.
///
/// Fallible functions: call through [`Memoizer::try_call`] so `Err` is not cached.
pub fn memoize_lru<A, V, F>(func: F, max_size: usize) -> MemoizeLru<A, V, F>
where
    F: Fn(A) -> V,
    A: Hash + Eq + Clone,
    V: Clone,
{
    Memoizer::new(func, Identity, BoundedCache::new(max_size))
}
