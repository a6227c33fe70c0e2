//! Shared application state for the demo API.

use std::sync::Arc;

use crate::cache::{MemoryCache, SharedBackend, SwrCache};
use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::invalidation::CacheInvalidation;
use crate::ratelimit::{IpRateLimiter, RateLimitConfig, RateLimitPreset};

/// Limits applied to each route group.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub public: RateLimitConfig,
    pub search: RateLimitConfig,
    pub admin: RateLimitConfig,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            public: RateLimitPreset::Public.config(),
            search: RateLimitPreset::Search.config(),
            admin: RateLimitPreset::Admin.config(),
        }
    }
}

/// Per-IP limiters built from [`RateLimits`], one counter namespace per group.
#[derive(Clone)]
pub struct Limiters {
    pub public: IpRateLimiter,
    pub search: IpRateLimiter,
    pub admin: IpRateLimiter,
}

/// Application state shared across all handlers.
///
/// One [`MemoryCache`] backs responses, SWR data and rate-limit counters.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MemoryCache>,
    pub backend: SharedBackend,
    pub swr: SwrCache,
    pub invalidation: CacheInvalidation,
    pub limiters: Limiters,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, clock: SharedClock, limits: RateLimits) -> Self {
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let backend: SharedBackend = cache.clone();

        let limiters = Limiters {
            public: IpRateLimiter::scoped("public", limits.public, backend.clone(), clock.clone()),
            search: IpRateLimiter::scoped("search", limits.search, backend.clone(), clock.clone()),
            admin: IpRateLimiter::scoped("admin", limits.admin, backend.clone(), clock.clone()),
        };

        Self {
            swr: SwrCache::new(backend.clone(), clock),
            invalidation: CacheInvalidation::new(backend.clone()),
            cache,
            backend,
            limiters,
            config: Arc::new(config),
        }
    }

    /// Creates state on the system clock with the conventional limits.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.clone(), system_clock(), RateLimits::default())
    }
}
