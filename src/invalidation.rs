//! Cache Invalidation Module
//!
//! Translates domain events into glob deletions over the shared cache.

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::SharedBackend;

/// Entity types whose listings are cached.
pub const ENTITY_TYPES: &[&str] = &["hotels", "restaurants", "attractions", "events", "sports"];

pub const SEARCH_PREFIX: &str = "search";
pub const USER_PREFIX: &str = "user";

// == Invalidation Report ==
/// Totals for one invalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Entries removed across all patterns
    pub deleted: usize,
    /// Patterns whose deletion failed
    pub failed: usize,
}

// == Cache Invalidation ==
/// Named invalidations run after successful writes to domain entities.
///
/// Each operation expands to a fixed list of patterns that are deleted
/// concurrently. A failing pattern is logged and does not stop the others.
/// Rate-limit counters are never touched.
#[derive(Clone)]
pub struct CacheInvalidation {
    backend: SharedBackend,
}

impl CacheInvalidation {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Drops cached data for one entity, or for every entity of the type.
    pub async fn invalidate_entity(&self, entity_type: &str, id: Option<&str>) -> InvalidationReport {
        self.delete_all(entity_patterns(entity_type, id)).await
    }

    /// Drops cached data scoped to a user.
    pub async fn invalidate_user(&self, user_id: &str) -> InvalidationReport {
        self.delete_all(vec![
            format!("{USER_PREFIX}:{user_id}"),
            format!("{USER_PREFIX}:{user_id}:*"),
        ])
        .await
    }

    /// Drops all cached search results.
    pub async fn invalidate_search(&self) -> InvalidationReport {
        self.delete_all(vec![format!("{SEARCH_PREFIX}:*")]).await
    }

    /// Drops every entity, search and user entry.
    pub async fn invalidate_all(&self) -> InvalidationReport {
        let mut patterns: Vec<String> = ENTITY_TYPES.iter().map(|t| format!("{t}:*")).collect();
        patterns.push(format!("{SEARCH_PREFIX}:*"));
        patterns.push(format!("{USER_PREFIX}:*"));
        self.delete_all(patterns).await
    }

    async fn delete_all(&self, patterns: Vec<String>) -> InvalidationReport {
        let results = join_all(
            patterns
                .iter()
                .map(|pattern| self.backend.delete_pattern(pattern)),
        )
        .await;

        let mut report = InvalidationReport::default();
        for (pattern, result) in patterns.iter().zip(results) {
            match result {
                Ok(removed) => report.deleted += removed,
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "Pattern invalidation failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            "Invalidated {} entries across {} patterns ({} failed)",
            report.deleted,
            patterns.len(),
            report.failed
        );
        report
    }
}

fn entity_patterns(entity_type: &str, id: Option<&str>) -> Vec<String> {
    match id {
        Some(id) => vec![
            format!("{entity_type}:{id}"),
            format!("{entity_type}:{id}:*"),
            format!("{entity_type}:list:*"),
            format!("{SEARCH_PREFIX}:*"),
        ],
        None => vec![format!("{entity_type}:*"), format!("{SEARCH_PREFIX}:*")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoundedIncrement, CacheBackend, MemoryCache};
    use crate::clock::ManualClock;
    use crate::error::{CacheError, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn seeded() -> (CacheInvalidation, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new(Arc::new(ManualClock::new(0))));
        for key in [
            "hotels:42",
            "hotels:42:reviews",
            "hotels:420",
            "hotels:list:/api/hotels?page=1",
            "restaurants:7",
            "search:/api/search?q=spa",
            "user:u1",
            "user:u1:bookings",
            "user:u2",
            "rate_limit:1.2.3.4:28333333",
        ] {
            cache.set(key, json!(1), 600).await.unwrap();
        }
        (CacheInvalidation::new(cache.clone()), cache)
    }

    async fn present(cache: &MemoryCache, key: &str) -> bool {
        cache.exists(key).await.unwrap()
    }

    #[tokio::test]
    async fn test_invalidate_single_entity() {
        let (inv, cache) = seeded().await;

        let report = inv.invalidate_entity("hotels", Some("42")).await;

        assert_eq!(report, InvalidationReport { deleted: 4, failed: 0 });
        assert!(!present(&cache, "hotels:42").await);
        assert!(!present(&cache, "hotels:42:reviews").await);
        assert!(!present(&cache, "hotels:list:/api/hotels?page=1").await);
        assert!(!present(&cache, "search:/api/search?q=spa").await);
        assert!(present(&cache, "hotels:420").await);
        assert!(present(&cache, "restaurants:7").await);
    }

    #[tokio::test]
    async fn test_invalidate_entity_type() {
        let (inv, cache) = seeded().await;

        inv.invalidate_entity("hotels", None).await;

        assert!(!present(&cache, "hotels:420").await);
        assert!(present(&cache, "restaurants:7").await);
        assert!(present(&cache, "user:u1").await);
    }

    #[tokio::test]
    async fn test_invalidate_user() {
        let (inv, cache) = seeded().await;

        let report = inv.invalidate_user("u1").await;

        assert_eq!(report.deleted, 2);
        assert!(present(&cache, "user:u2").await);
    }

    #[tokio::test]
    async fn test_invalidate_search_only() {
        let (inv, cache) = seeded().await;

        let report = inv.invalidate_search().await;

        assert_eq!(report.deleted, 1);
        assert!(present(&cache, "hotels:42").await);
        assert_eq!(cache.len().await, 9);
    }

    #[tokio::test]
    async fn test_invalidate_all_keeps_rate_limits() {
        let (inv, cache) = seeded().await;

        inv.invalidate_all().await;

        assert_eq!(cache.len().await, 1);
        assert!(present(&cache, "rate_limit:1.2.3.4:28333333").await);
    }

    /// Fails deletes for search patterns only.
    struct FlakySearch(MemoryCache);

    #[async_trait]
    impl CacheBackend for FlakySearch {
        async fn get(&self, key: &str) -> Result<Option<Value>> {
            self.0.get(key).await
        }
        async fn set(&self, key: &str, value: Value, ttl: u64) -> Result<()> {
            self.0.set(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> Result<bool> {
            self.0.delete(key).await
        }
        async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
            if pattern.starts_with("search") {
                return Err(CacheError::Storage("search shard offline".into()));
            }
            self.0.delete_pattern(pattern).await
        }
        async fn exists(&self, key: &str) -> Result<bool> {
            self.0.exists(key).await
        }
        async fn clear(&self) -> Result<()> {
            self.0.clear().await
        }
        async fn increment_bounded(&self, key: &str, max: u64, ttl: u64) -> Result<BoundedIncrement> {
            self.0.increment_bounded(key, max, ttl).await
        }
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_block_other_patterns() {
        let backend = Arc::new(FlakySearch(MemoryCache::new(Arc::new(ManualClock::new(0)))));
        backend.set("hotels:1", json!(1), 60).await.unwrap();
        backend.set("search:x", json!(1), 60).await.unwrap();
        let inv = CacheInvalidation::new(backend.clone());

        let report = inv.invalidate_entity("hotels", None).await;

        assert_eq!(report, InvalidationReport { deleted: 1, failed: 1 });
        assert!(!backend.exists("hotels:1").await.unwrap());
        assert!(backend.exists("search:x").await.unwrap());
    }
}
