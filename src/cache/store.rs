//! Cache Store Module
//!
//! Main cache engine: HashMap storage with lazy and sweep-based TTL expiration.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::stats::Removal;
use crate::cache::{CacheEntry, CacheStats, GlobPattern};
use crate::clock::{system_clock, SharedClock};
use crate::error::{CacheError, Result};

// == Bounded Increment ==
/// Outcome of [`CacheStore::increment_bounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedIncrement {
    /// Counter value after the call
    pub count: u64,
    /// False when the counter was already at the bound and left untouched
    pub incremented: bool,
}

// == Cache Store ==
/// Main cache storage with TTL support.
///
/// Methods take `&mut self`; callers share the store behind a lock so every
/// check-then-act sequence runs under one guard.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Time source for ages
    clock: SharedClock,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store reading time from `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
            clock,
        }
    }

    /// Creates an empty store on the system clock.
    pub fn with_system_clock() -> Self {
        Self::new(system_clock())
    }

    // == Set ==
    /// Stores a value, overwriting any existing entry and resetting its age.
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl_seconds: u64) {
        let entry = CacheEntry::new(value, ttl_seconds, self.clock.now_ms());
        self.entries.insert(key.into(), entry);
        self.stats.record_set();
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.purge_if_expired(key);

        let value = self.entries.get(key).map(|entry| entry.value.clone());
        self.stats.record_lookup(value.is_some());
        value
    }

    // == Exists ==
    /// Returns true if a live entry exists. Does not touch hit/miss counters.
    pub fn exists(&mut self, key: &str) -> bool {
        self.purge_if_expired(key);
        self.entries.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if a live entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.purge_if_expired(key);

        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_removed(Removal::Deleted, 1);
        }
        removed
    }

    // == Delete Pattern ==
    /// Removes every entry whose key matches `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_pattern(&mut self, pattern: &GlobPattern) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.matches(key));
        let removed = before - self.entries.len();

        self.stats.record_removed(Removal::Deleted, removed);
        removed
    }

    // == Clear ==
    /// Drops all entries. Returns the number of entries removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_removed(Removal::Deleted, removed);
        removed
    }

    // == Increment Bounded ==
    /// Increments the integer counter at `key` unless it already reached `max`.
    ///
    /// A missing or expired counter counts as zero. When incremented, the
    /// counter is rewritten with `ttl_seconds`.
    pub fn increment_bounded(
        &mut self,
        key: &str,
        max: u64,
        ttl_seconds: u64,
    ) -> Result<BoundedIncrement> {
        self.purge_if_expired(key);

        let count = match self.entries.get(key) {
            Some(entry) => entry.value.as_u64().ok_or_else(|| {
                CacheError::InvalidRequest(format!("value at '{}' is not a counter", key))
            })?,
            None => 0,
        };

        if count >= max {
            return Ok(BoundedIncrement {
                count,
                incremented: false,
            });
        }

        self.set(key, Value::from(count + 1), ttl_seconds);
        Ok(BoundedIncrement {
            count: count + 1,
            incremented: true,
        })
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Uses the same predicate as the lazy check in `get`. Returns the number
    /// of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();

        self.stats.record_removed(Removal::Expired, removed);
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_if_expired(&mut self, key: &str) {
        let now = self.clock.now_ms();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
            self.stats.record_removed(Removal::Expired, 1);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn manual_store() -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        (CacheStore::new(clock.clone()), clock)
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::with_system_clock();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let (mut store, _) = manual_store();

        store.set("key1", json!({"name": "Hotel Sacher"}), 60);
        let value = store.get("key1").unwrap();

        assert_eq!(value, json!({"name": "Hotel Sacher"}));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (mut store, _) = manual_store();
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let (mut store, _) = manual_store();

        store.set("key1", json!(1), 60);
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite_resets_age() {
        let (mut store, clock) = manual_store();

        store.set("key1", json!("v1"), 2);
        clock.advance(Duration::from_millis(1_500));
        store.set("key1", json!("v2"), 2);
        clock.advance(Duration::from_millis(1_500));

        assert_eq!(store.get("key1"), Some(json!("v2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let (mut store, clock) = manual_store();

        store.set("key1", json!("value1"), 1);
        assert!(store.exists("key1"));

        clock.advance(Duration::from_millis(1_001));

        assert!(!store.exists("key1"));
        assert!(store.get("key1").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_zero_ttl_never_retrievable() {
        let (mut store, _) = manual_store();
        store.set("gone", json!(true), 0);
        assert!(store.get("gone").is_none());
    }

    #[test]
    fn test_store_delete_pattern() {
        let (mut store, _) = manual_store();

        store.set("user:1:a", json!(1), 60);
        store.set("user:1:b", json!(2), 60);
        store.set("other", json!(3), 60);

        let removed = store.delete_pattern(&GlobPattern::new("user:1:*").unwrap());

        assert_eq!(removed, 2);
        assert!(store.get("user:1:a").is_none());
        assert!(store.get("user:1:b").is_none());
        assert_eq!(store.get("other"), Some(json!(3)));
    }

    #[test]
    fn test_store_clear() {
        let (mut store, _) = manual_store();
        store.set("a", json!(1), 60);
        store.set("b", json!(2), 60);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_stats() {
        let (mut store, clock) = manual_store();

        store.set("key1", json!("value1"), 1);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss
        clock.advance(Duration::from_secs(2));
        store.get("key1"); // expired miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_store_sweep_expired() {
        let (mut store, clock) = manual_store();

        store.set("key1", json!("value1"), 1);
        store.set("key2", json!("value2"), 10);

        clock.advance(Duration::from_millis(1_100));

        let removed = store.sweep_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_increment_bounded_stops_at_max() {
        let (mut store, _) = manual_store();

        let counts: Vec<_> = (0..4)
            .map(|_| store.increment_bounded("rl:1", 3, 60).unwrap())
            .collect();

        assert_eq!(counts[0], BoundedIncrement { count: 1, incremented: true });
        assert_eq!(counts[2], BoundedIncrement { count: 3, incremented: true });
        assert_eq!(counts[3], BoundedIncrement { count: 3, incremented: false });
        assert_eq!(store.get("rl:1"), Some(json!(3)));
    }

    #[test]
    fn test_increment_bounded_restarts_after_expiry() {
        let (mut store, clock) = manual_store();

        store.increment_bounded("rl", 5, 1).unwrap();
        store.increment_bounded("rl", 5, 1).unwrap();
        clock.advance(Duration::from_secs(2));

        let next = store.increment_bounded("rl", 5, 1).unwrap();
        assert_eq!(next.count, 1);
    }

    #[test]
    fn test_increment_bounded_rejects_non_counter() {
        let (mut store, _) = manual_store();
        store.set("rl", json!("text"), 60);

        let result = store.increment_bounded("rl", 5, 60);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
