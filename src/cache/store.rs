//! Cache Store Module
//!
//! Ordered key-value storage with lazy TTL expiration and prefix invalidation.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock};

// == Cache Store ==
/// Synchronous cache storage.
///
/// Keys are kept in a `BTreeMap` so that prefix invalidation is a range scan
/// over the matching keys only. Expired entries stay in memory until the next
/// `get`/`has` on their key (or an explicit [`CacheStore::purge_expired`]).
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: BTreeMap<String, CacheEntry<V>>,
    stats: CacheStats,
    clock: Arc<dyn Clock>,
    /// Invalidation counter per scope (usually a table name)
    generations: HashMap<String, u64>,
    /// Bumped by `clear`, which invalidates every scope at once
    epoch: u64,
}

// == Generation ==
/// Invalidation counters observed before a remote fetch.
///
/// A value fetched under an older generation may predate a write, so it is
/// only stored while the generation is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    scopes: Vec<(String, u64)>,
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> CacheStore<V> {
    // == Constructors ==
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: BTreeMap::new(),
            stats: CacheStats::new(),
            clock,
            generations: HashMap::new(),
            epoch: 0,
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl_seconds`, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl_seconds: u64) {
        let entry = CacheEntry::new(value, ttl_seconds, self.clock.now_ms());
        self.entries.insert(key.into(), entry);
    }

    /// Stores `value` only if no scope in `seen` was invalidated since it was
    /// observed. Returns whether the value was stored.
    pub fn set_if_current(
        &mut self,
        key: impl Into<String>,
        value: V,
        ttl_seconds: u64,
        seen: &Generation,
    ) -> bool {
        if !self.is_current(seen) {
            return false;
        }
        self.set(key, value, ttl_seconds);
        true
    }

    // == Generations ==
    /// Captures the invalidation counters of `scopes`.
    pub fn generation(&self, scopes: &[&str]) -> Generation {
        Generation {
            epoch: self.epoch,
            scopes: scopes
                .iter()
                .map(|scope| {
                    let count = self.generations.get(*scope).copied().unwrap_or(0);
                    (scope.to_string(), count)
                })
                .collect(),
        }
    }

    /// Marks every value fetched for `scope` before now as stale.
    pub fn bump_generation(&mut self, scope: &str) {
        let count = self.generations.entry(scope.to_string()).or_insert(0);
        *count = count.wrapping_add(1);
    }

    pub fn is_current(&self, seen: &Generation) -> bool {
        seen.epoch == self.epoch
            && seen
                .scopes
                .iter()
                .all(|(scope, count)| self.generations.get(scope).copied().unwrap_or(0) == *count)
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.live_value(key);
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    /// Like [`CacheStore::get`] but leaves hit/miss counters alone.
    pub(crate) fn peek(&mut self, key: &str) -> Option<V> {
        self.live_value(key)
    }

    // == Has ==
    /// Returns whether a live entry exists, evicting it if expired.
    pub fn has(&mut self, key: &str) -> bool {
        self.live_value(key).is_some()
    }

    fn live_value(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.entries.remove(key);
            self.stats.record_expiration();
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    // == Delete By Prefix ==
    /// Removes every key starting with `prefix` and returns how many were removed.
    pub fn delete_by_prefix(&mut self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.entries.remove(key);
        }
        self.stats.record_invalidations(doomed.len());
        doomed.len()
    }

    // == Clear ==
    /// Drops every entry and returns how many were stored.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.epoch = self.epoch.wrapping_add(1);
        self.stats.record_invalidations(count);
        count
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        removed
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over stored keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
