//! Stale-While-Revalidate Module
//!
//! Serves cached data while it is fresh or merely stale, refreshing stale
//! data in the background.

use std::fmt::Display;
use std::future::Future;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::backend::{get_json, SharedBackend};
use crate::clock::SharedClock;

/// Stored wrapper recording when the data was fetched.
#[derive(Debug, Serialize, Deserialize)]
struct SwrEnvelope<T> {
    data: T,
    timestamp: u64,
}

// == SWR Cache ==
/// Stale-while-revalidate reader over a cache backend.
#[derive(Clone)]
pub struct SwrCache {
    backend: SharedBackend,
    clock: SharedClock,
}

impl SwrCache {
    pub fn new(backend: SharedBackend, clock: SharedClock) -> Self {
        Self { backend, clock }
    }

    /// Returns the value at `key`, fetching it when needed.
    ///
    /// - age below `stale_seconds`: cached data, `fetch` is not called.
    /// - age below `ttl_seconds`: cached data, `fetch` runs in a background
    ///   task whose failure is only logged.
    /// - missing or older: `fetch` is awaited and its error returned as-is.
    ///
    /// Concurrent callers on a cold key each run their own `fetch`; the last
    /// write wins.
    pub async fn get_with_swr<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        ttl_seconds: u64,
        stale_seconds: u64,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(cached) = get_json::<SwrEnvelope<T>>(self.backend.as_ref(), key).await {
            let age = self.clock.now_ms().saturating_sub(cached.timestamp);

            if age < stale_seconds.saturating_mul(1000) {
                debug!(key, age, "SWR fresh hit");
                return Ok(cached.data);
            }

            if age < ttl_seconds.saturating_mul(1000) {
                debug!(key, age, "SWR stale hit, refreshing in background");
                self.spawn_refresh(key.to_string(), fetch, ttl_seconds);
                return Ok(cached.data);
            }
        }

        let data = fetch().await?;
        let value = envelope(key, &data, self.clock.now_ms());
        store(&self.backend, key, value, ttl_seconds).await;
        Ok(data)
    }

    fn spawn_refresh<T, E, F, Fut>(&self, key: String, fetch: F, ttl_seconds: u64)
    where
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let backend = self.backend.clone();
        let clock = self.clock.clone();

        tokio::spawn(async move {
            match fetch().await {
                Ok(data) => {
                    let value = envelope(&key, &data, clock.now_ms());
                    store(&backend, &key, value, ttl_seconds).await;
                }
                Err(err) => warn!(key = %key, error = %err, "Background SWR refresh failed"),
            }
        });
    }
}

/// Wraps `data` with its fetch time. Serialization failures are logged.
fn envelope<T: Serialize>(key: &str, data: &T, now_ms: u64) -> Option<Value> {
    let envelope = SwrEnvelope {
        data,
        timestamp: now_ms,
    };
    serde_json::to_value(&envelope)
        .map_err(|err| warn!(key, error = %err, "Failed to serialize SWR value"))
        .ok()
}

async fn store(backend: &SharedBackend, key: &str, value: Option<Value>, ttl_seconds: u64) {
    let Some(value) = value else { return };
    if let Err(err) = backend.set(key, value, ttl_seconds).await {
        warn!(key, error = %err, "Failed to store SWR value");
    }
}
