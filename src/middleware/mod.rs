//! Middleware Module
//!
//! axum middleware that wraps route handlers with response caching and
//! rate limiting. Both degrade to calling the handler directly when their
//! own machinery fails.

pub mod rate_limit;
pub mod response_cache;

pub use rate_limit::rate_limit;
pub use response_cache::{cache_response, CacheStatus, ResponseCache, ResponseCacheOptions};

/// Cache outcome: HIT, MISS, BYPASS or ERROR
pub const X_CACHE_STATUS: &str = "x-cache-status";
pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// RFC 3339 timestamp at which the current window ends
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";
