//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, glob-pattern invalidation
//! and stale-while-revalidate reads.

pub mod backend;
mod entry;
pub mod keys;
mod pattern;
mod stats;
mod store;
pub mod swr;


// Re-export public types
pub use backend::{get_json, set_json, CacheBackend, MemoryCache, SharedBackend};
pub use entry::CacheEntry;
pub use keys::{cache_key, url_key};
pub use pattern::GlobPattern;
pub use stats::CacheStats;
pub use store::{BoundedIncrement, CacheStore};
pub use swr::SwrCache;

// == Public Constants ==
/// Interval between passive sweeps of expired entries (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
