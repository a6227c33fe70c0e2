//! Cache Backend Module
//!
//! The async interface consumers program against, and its in-memory implementation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{BoundedIncrement, CacheStats, CacheStore, GlobPattern};
use crate::clock::SharedClock;
use crate::error::Result;
use crate::tasks::spawn_cleanup_task;

// == Cache Backend Trait ==
/// Storage interface used by the rate limiter, middleware and invalidation.
///
/// Every method is fallible so a networked store can stand in for the
/// in-memory one without changing callers.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a live value, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value, replacing any previous entry
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()>;

    /// Delete a key. Returns true if a live entry was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key matching a `*` glob. Returns the number removed
    async fn delete_pattern(&self, pattern: &str) -> Result<usize>;

    /// Check whether a live entry exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Drop all entries
    async fn clear(&self) -> Result<()>;

    /// Atomically increment the counter at `key` unless it reached `max`
    async fn increment_bounded(
        &self,
        key: &str,
        max: u64,
        ttl_seconds: u64,
    ) -> Result<BoundedIncrement>;
}

/// Shared handle to a cache backend.
pub type SharedBackend = Arc<dyn CacheBackend>;

// == Typed Helpers ==
/// Reads and deserializes a value.
///
/// Storage and deserialization failures are logged and reported as a miss.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheBackend, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                warn!(key, error = %err, "Cached value has unexpected shape");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!(key, error = %err, "Cache get failed");
            None
        }
    }
}

/// Serializes and stores a value.
///
/// Failures are logged and otherwise ignored.
pub async fn set_json<T: Serialize>(cache: &dyn CacheBackend, key: &str, value: &T, ttl_seconds: u64) {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "Failed to serialize value for cache");
            return;
        }
    };

    if let Err(err) = cache.set(key, value, ttl_seconds).await {
        warn!(key, error = %err, "Cache set failed");
    }
}

// == Memory Cache ==
/// In-process cache backend with an optional background sweeper.
#[derive(Debug)]
pub struct MemoryCache {
    store: Arc<RwLock<CacheStore>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryCache {
    /// Creates an empty cache reading time from `clock`. No sweeper runs
    /// until [`MemoryCache::start_sweeper`] is called.
    pub fn new(clock: SharedClock) -> Self {
        Self::from_store(CacheStore::new(clock))
    }

    /// Wraps an existing store.
    pub fn from_store(store: CacheStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            sweeper: Mutex::new(None),
        }
    }

    /// Starts the periodic sweep of expired entries, replacing any running sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self, interval: Duration) {
        let handle = spawn_cleanup_task(self.store.clone(), interval);
        if let Some(previous) = self.lock_sweeper().replace(handle) {
            previous.abort();
        }
    }

    /// Stops the sweeper and drops every entry.
    pub async fn destroy(&self) {
        if let Some(handle) = self.lock_sweeper().take() {
            handle.abort();
            debug!("Cache sweeper aborted");
        }
        let removed = self.store.write().await.clear();
        info!("Cache destroyed, {} entries dropped", removed);
    }

    /// Runs one sweep immediately. Returns the number of entries removed.
    pub async fn sweep_now(&self) -> usize {
        self.store.write().await.sweep_expired()
    }

    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Number of stored entries, including expired ones not yet reclaimed.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// True while a sweeper task is attached and running.
    pub fn sweeper_running(&self) -> bool {
        self.lock_sweeper()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_sweeper(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // The guarded Option stays consistent even if a holder panicked
        self.sweeper.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_sweeper().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()> {
        self.store.write().await.set(key, value, ttl_seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.delete(key))
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = GlobPattern::new(pattern)?;
        let removed = self.store.write().await.delete_pattern(&pattern);
        debug!(pattern = pattern.as_str(), removed, "Pattern delete");
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.exists(key))
    }

    async fn clear(&self) -> Result<()> {
        self.store.write().await.clear();
        Ok(())
    }

    async fn increment_bounded(
        &self,
        key: &str,
        max: u64,
        ttl_seconds: u64,
    ) -> Result<BoundedIncrement> {
        self.store.write().await.increment_bounded(key, max, ttl_seconds)
    }
}
