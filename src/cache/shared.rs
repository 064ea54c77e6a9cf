//! Shared Cache Module
//!
//! Cloneable async handle over a [`CacheStore`], with `get_or_set` memoization.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::cache::{CacheStats, CacheStore, Clock, Generation};

// == Shared Cache ==
/// Handle to a cache instance owned by the application's composition root.
///
/// Cloning the handle shares the underlying store. Lock guards are never held
/// across a caller-supplied future.
#[derive(Debug)]
pub struct SharedCache<V> {
    store: Arc<RwLock<CacheStore<V>>>,
    /// One gate per key currently being fetched by `get_or_set`
    in_flight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<V> Clone for SharedCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<V: Clone> Default for SharedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> SharedCache<V> {
    pub fn new() -> Self {
        Self::from_store(CacheStore::new())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_store(CacheStore::with_clock(clock))
    }

    pub fn from_store(store: CacheStore<V>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: V, ttl_seconds: u64) {
        self.store.write().await.set(key, value, ttl_seconds);
    }

    /// Stores `value` unless a scope in `seen` was invalidated in the meantime.
    pub async fn set_if_current(
        &self,
        key: impl Into<String>,
        value: V,
        ttl_seconds: u64,
        seen: &Generation,
    ) -> bool {
        let stored = self
            .store
            .write()
            .await
            .set_if_current(key, value, ttl_seconds, seen);
        if !stored {
            debug!("skipped caching a value fetched before an invalidation");
        }
        stored
    }

    pub async fn generation(&self, scopes: &[&str]) -> Generation {
        self.store.read().await.generation(scopes)
    }

    pub async fn bump_generation(&self, scope: &str) {
        self.store.write().await.bump_generation(scope);
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn delete_by_prefix(&self, prefix: &str) -> usize {
        let removed = self.store.write().await.delete_by_prefix(prefix);
        debug!(prefix, removed, "cache prefix invalidated");
        removed
    }

    pub async fn clear(&self) -> usize {
        self.store.write().await.clear()
    }

    pub async fn purge_expired(&self) -> usize {
        self.store.write().await.purge_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Get Or Set ==
    /// Returns the live value for `key`, or runs `fetch` and caches its result.
    ///
    /// Concurrent callers for the same cold key wait on a per-key gate, so
    /// `fetch` runs once and the waiters read the stored value. An `Err` from
    /// `fetch` is returned unchanged and nothing is cached; the next waiter
    /// then runs its own `fetch`.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, ttl_seconds: u64, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_set_in(&[], key, ttl_seconds, fetch).await
    }

    /// Like [`SharedCache::get_or_set`], for values derived from `scopes`.
    ///
    /// If any scope is invalidated while `fetch` runs, the fetched value is
    /// still returned but not cached, since it may predate the write.
    pub async fn get_or_set_in<F, Fut, E>(
        &self,
        scopes: &[&str],
        key: &str,
        ttl_seconds: u64,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let gate = self.gate_for(key).await;
        let result = {
            let _guard = gate.lock().await;
            let (cached, seen) = {
                let mut store = self.store.write().await;
                (store.peek(key), store.generation(scopes))
            };
            match cached {
                Some(value) => Ok(value),
                None => {
                    let fetched = fetch().await;
                    if let Ok(value) = &fetched {
                        self.set_if_current(key, value.clone(), ttl_seconds, &seen)
                            .await;
                    }
                    fetched
                }
            }
        };
        self.release_gate(key, gate).await;
        result
    }

    async fn gate_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(in_flight.entry(key.to_string()).or_default())
    }

    async fn release_gate(&self, key: &str, gate: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // the map and `gate` are the last two holders: nobody else is waiting
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(key);
        }
        drop(gate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache_with_clock() -> (SharedCache<String>, ManualClock) {
        let clock = ManualClock::new(0);
        (SharedCache::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_get_or_set_cold_calls_fetch_once() {
        let (cache, _) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let value = cache
            .get_or_set("groups:list:1", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("groups:list:1").await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_get_or_set_warm_skips_fetch() {
        let (cache, _) = cache_with_clock();
        cache.set("k", "cached".to_string(), 60).await;
        let calls = AtomicUsize::new(0);

        let value = cache
            .get_or_set("k", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_cache_errors() {
        let (cache, _) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_set("k", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>("remote down")
            })
            .await;
        assert_eq!(first, Err("remote down"));
        assert!(!cache.has("k").await);

        let second = cache
            .get_or_set("k", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>("recovered".to_string())
            })
            .await;
        assert_eq!(second.as_deref(), Ok("recovered"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_or_set_refetches_after_expiry() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "old".to_string(), 10).await;
        clock.advance_secs(10);

        let value = cache
            .get_or_set("k", 10, || async { Ok::<_, String>("new".to_string()) })
            .await
            .unwrap();

        assert_eq!(value, "new");
    }

    #[tokio::test]
    async fn test_get_or_set_coalesces_concurrent_cold_fetches() {
        let cache: SharedCache<String> = SharedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_set("sessions:list:page=1", 60, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>("rows".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "rows");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_set_in_drops_value_fetched_across_invalidation() {
        let (cache, _) = cache_with_clock();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_set_in(&["groups"], "groups:list:page=1", 60, || async move {
                        let snapshot = "before write".to_string();
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, String>(snapshot)
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        cache.bump_generation("groups").await;
        release_tx.send(()).unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), "before write");
        assert!(!cache.has("groups:list:page=1").await);

        let value = cache
            .get_or_set_in(&["groups"], "groups:list:page=1", 60, || async {
                Ok::<_, String>("after write".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "after write");
        assert_eq!(cache.get("groups:list:page=1").await.as_deref(), Some("after write"));
    }

    #[tokio::test]
    async fn test_get_or_set_in_ignores_other_scopes() {
        let (cache, _) = cache_with_clock();

        cache
            .get_or_set_in(&["groups"], "groups:list:page=1", 60, || async {
                cache.bump_generation("sessions").await;
                Ok::<_, String>("rows".to_string())
            })
            .await
            .unwrap();

        assert!(cache.has("groups:list:page=1").await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache: SharedCache<u32> = SharedCache::new();
        let other = cache.clone();

        cache.set("a", 1, 60).await;
        assert_eq!(other.get("a").await, Some(1));

        other.clear().await;
        assert!(cache.is_empty().await);
    }
}
