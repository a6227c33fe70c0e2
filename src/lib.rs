//! tourcache - in-process caching and rate limiting for a tourism CMS
//!
//! TTL cache with glob invalidation, stale-while-revalidate reads,
//! fixed-window rate limiting, and the axum middleware that puts them in
//! front of route handlers.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheBackend, MemoryCache, SharedBackend, SwrCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use invalidation::{CacheInvalidation, InvalidationReport};
pub use ratelimit::{RateLimitConfig, RateLimitPreset, RateLimiter};
pub use tasks::spawn_cleanup_task;
