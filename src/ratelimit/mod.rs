//! Rate Limit Module
//!
//! Fixed-window request counting backed by the shared cache.

mod config;
mod limiter;

pub use config::{
    client_ip, KeyGenerator, LimitReachedCallback, RateLimitConfig, RateLimitPreset,
    DEFAULT_MESSAGE,
};
pub use limiter::{
    IpRateLimiter, RateLimitResult, RateLimitStats, RateLimiter, UserRateLimiter, IP_KEY_PREFIX,
    USER_KEY_PREFIX,
};
