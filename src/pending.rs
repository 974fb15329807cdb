//! Pending request registry: one in-flight operation per key.
//!
//! The first caller for a key starts the operation and registers a shared
//! handle to it; later callers for the same key join that handle and receive
//! the same `Ok` or `Err`. The entry is removed when the [`PendingGuard`]
//! handed to the operation is dropped, which happens on success, failure
//! and panic alike.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

/// Cloneable handle to an in-flight operation.
pub type SharedResult<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct PendingEntry<V, E> {
    id: u64,
    future: SharedResult<V, E>,
}

/// Outcome of [`PendingRequestRegistry::claim`].
pub enum Attach<V, E> {
    /// The value turned up while the registry lock was held.
    Ready(V),
    /// Another caller already started the operation.
    Joined(SharedResult<V, E>),
    /// This caller started the operation.
    Started(SharedResult<V, E>),
}

impl<V: Clone, E: Clone> Attach<V, E> {
    pub fn is_joined(&self) -> bool {
        matches!(self, Attach::Joined(_))
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Attach::Started(_))
    }

    /// Wait for the result.
    pub async fn wait(self) -> Result<V, E> {
        match self {
            Attach::Ready(value) => Ok(value),
            Attach::Joined(future) | Attach::Started(future) => future.await,
        }
    }
}

pub struct PendingRequestRegistry<K, V, E> {
    entries: Mutex<HashMap<K, PendingEntry<V, E>>>,
    next_id: AtomicU64,
}

impl<K, V, E> PendingRequestRegistry<K, V, E>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight operation for `key`, or start one.
    ///
    /// With the registry lock held: an existing entry is joined; otherwise
    /// `ready` gets a last chance to produce the value (an operation that
    /// settled just before the lock was taken has already published its
    /// result); otherwise `start` is called with the guard that owns the new
    /// entry and its future is registered before the lock is released.
    ///
    /// `start` must not touch this registry. The future it returns must
    /// keep making progress when nobody polls it (typically by awaiting a
    /// spawned task), and must drop the guard once settled.
    pub fn claim<R, S>(self: &Arc<Self>, key: K, ready: R, start: S) -> Attach<V, E>
    where
        R: FnOnce(&K) -> Option<V>,
        S: FnOnce(PendingGuard<K, V, E>) -> BoxFuture<'static, Result<V, E>>,
    {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(&key) {
            debug!(key = ?key, id = entry.id, "pending_joined");
            return Attach::Joined(entry.future.clone());
        }

        if let Some(value) = ready(&key) {
            return Attach::Ready(value);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = PendingGuard {
            registry: Arc::clone(self),
            key: key.clone(),
            id,
        };
        let future = start(guard).shared();
        entries.insert(
            key.clone(),
            PendingEntry {
                id,
                future: future.clone(),
            },
        );
        debug!(key = ?key, id, "pending_started");
        Attach::Started(future)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove `key` only if it still belongs to operation `id`.
    fn settle(&self, key: &K, id: u64) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.id == id) {
            entries.remove(key);
            debug!(key = ?key, id, "pending_settled");
        }
    }
}

impl<K, V, E> Default for PendingRequestRegistry<K, V, E>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Owns a registry entry; dropping it removes the entry.
pub struct PendingGuard<K, V, E>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    E: Clone,
{
    registry: Arc<PendingRequestRegistry<K, V, E>>,
    key: K,
    id: u64,
}

impl<K, V, E> PendingGuard<K, V, E>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    E: Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V, E> Drop for PendingGuard<K, V, E>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        self.registry.settle(&self.key, self.id);
    }
}
