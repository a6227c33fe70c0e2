//! Fixed-window rate limiter on top of the cache backend.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::SharedBackend;
use crate::clock::SharedClock;
use crate::ratelimit::RateLimitConfig;

/// Namespace for per-IP counters.
pub const IP_KEY_PREFIX: &str = "rate_limit";
/// Namespace for per-user counters.
pub const USER_KEY_PREFIX: &str = "user_rate_limit";

// == Rate Limit Result ==
/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Unix ms at which the current window ends
    pub reset_time: u64,
    /// Requests counted in the current window
    pub total_hits: u32,
}

// == Stats ==
/// Snapshot of limiter counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RateLimitStats {
    pub allowed: u64,
    pub blocked: u64,
    /// Requests admitted because the counter store failed
    pub fail_open: u64,
}

#[derive(Debug, Default)]
struct Counters {
    allowed: AtomicU64,
    blocked: AtomicU64,
    fail_open: AtomicU64,
}

// == Rate Limiter ==
/// Counts requests per key in epoch-anchored windows of `config.window`.
///
/// Counters live in the shared cache under `<key>:<window_index>` and expire
/// with their window. Storage failures admit the request.
pub struct RateLimiter {
    config: RateLimitConfig,
    backend: SharedBackend,
    clock: SharedClock,
    counters: Counters,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, backend: SharedBackend, clock: SharedClock) -> Self {
        Self {
            config,
            backend,
            clock,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks a request against the limit using the configured key generator.
    pub fn is_allowed(&self, req: &Request) -> impl Future<Output = RateLimitResult> + Send + '_ {
        let key = (self.config.key_generator)(req);
        async move { self.is_allowed_for_key(&key).await }
    }

    /// Checks and counts one request for `key`.
    pub async fn is_allowed_for_key(&self, key: &str) -> RateLimitResult {
        let window_ms = self.config.window_ms();
        let max = self.config.max_requests;
        let window_index = self.clock.now_ms() / window_ms;
        let reset_time = (window_index + 1) * window_ms;
        let window_key = format!("{}:{}", key, window_index);

        let outcome = self
            .backend
            .increment_bounded(&window_key, u64::from(max), self.config.counter_ttl_seconds())
            .await;

        match outcome {
            Ok(step) if step.incremented => {
                let total_hits = clamp_u32(step.count);
                self.counters.allowed.fetch_add(1, Ordering::Relaxed);
                RateLimitResult {
                    allowed: true,
                    remaining: max.saturating_sub(total_hits),
                    reset_time,
                    total_hits,
                }
            }
            Ok(step) => {
                self.counters.blocked.fetch_add(1, Ordering::Relaxed);
                debug!(key, hits = step.count, "Rate limit reached");
                if let Some(callback) = &self.config.on_limit_reached {
                    callback(key);
                }
                RateLimitResult {
                    allowed: false,
                    remaining: 0,
                    reset_time,
                    total_hits: clamp_u32(step.count),
                }
            }
            Err(err) => {
                warn!(key, error = %err, "Rate limit storage failed, allowing request");
                self.counters.fail_open.fetch_add(1, Ordering::Relaxed);
                RateLimitResult {
                    allowed: true,
                    remaining: max.saturating_sub(1),
                    reset_time,
                    total_hits: 1,
                }
            }
        }
    }

    /// Whole seconds until the window in `result` ends, rounded up.
    pub fn retry_after_secs(&self, result: &RateLimitResult) -> u64 {
        result
            .reset_time
            .saturating_sub(self.clock.now_ms())
            .div_ceil(1000)
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            allowed: self.counters.allowed.load(Ordering::Relaxed),
            blocked: self.counters.blocked.load(Ordering::Relaxed),
            fail_open: self.counters.fail_open.load(Ordering::Relaxed),
        }
    }
}

fn clamp_u32(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

// == IP Rate Limiter ==
/// Limits by client IP under the `rate_limit:` namespace.
#[derive(Clone)]
pub struct IpRateLimiter {
    inner: Arc<RateLimiter>,
    prefix: Arc<str>,
}

impl IpRateLimiter {
    /// Keys are `rate_limit:<ip>`.
    pub fn new(config: RateLimitConfig, backend: SharedBackend, clock: SharedClock) -> Self {
        Self::with_prefix(IP_KEY_PREFIX.into(), config, backend, clock)
    }

    /// Keys are `rate_limit:<scope>:<ip>`, so route groups sharing a window
    /// length keep separate counters.
    pub fn scoped(scope: &str, config: RateLimitConfig, backend: SharedBackend, clock: SharedClock) -> Self {
        Self::with_prefix(format!("{}:{}", IP_KEY_PREFIX, scope).into(), config, backend, clock)
    }

    fn with_prefix(prefix: Arc<str>, config: RateLimitConfig, backend: SharedBackend, clock: SharedClock) -> Self {
        let key_prefix = prefix.clone();
        let config = config.with_key_generator(move |req: &Request| {
            format!("{}:{}", key_prefix, super::client_ip(req.headers()))
        });
        Self {
            inner: Arc::new(RateLimiter::new(config, backend, clock)),
            prefix,
        }
    }

    pub async fn check(&self, req: &Request) -> RateLimitResult {
        self.inner.is_allowed(req).await
    }

    pub async fn check_ip(&self, ip: &str) -> RateLimitResult {
        self.inner
            .is_allowed_for_key(&format!("{}:{}", self.prefix, ip))
            .await
    }

    /// The underlying limiter, for use as middleware state.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.inner.clone()
    }
}

// == User Rate Limiter ==
/// Limits by authenticated user id under the `user_rate_limit:` namespace.
#[derive(Clone)]
pub struct UserRateLimiter {
    inner: Arc<RateLimiter>,
}

impl UserRateLimiter {
    pub fn new(config: RateLimitConfig, backend: SharedBackend, clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(RateLimiter::new(config, backend, clock)),
        }
    }

    pub async fn check_user(&self, user_id: &str) -> RateLimitResult {
        self.inner
            .is_allowed_for_key(&format!("{}:{}", USER_KEY_PREFIX, user_id))
            .await
    }

    pub fn stats(&self) -> RateLimitStats {
        self.inner.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoundedIncrement, CacheBackend, MemoryCache};
    use crate::clock::ManualClock;
    use crate::error::{CacheError, Result};
    use async_trait::async_trait;
    use axum::body::Body;
    use serde_json::Value;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    // Aligned to a 60 s boundary so whole-minute windows start here
    const START_MS: u64 = 1_699_999_980_000;

    fn setup(window: Duration, max: u32) -> (RateLimiter, Arc<ManualClock>, Arc<MemoryCache>) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let limiter = RateLimiter::new(
            RateLimitConfig::new(window, max),
            cache.clone(),
            clock.clone(),
        );
        (limiter, clock, cache)
    }

    /// Backend whose every operation fails.
    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _: &str) -> Result<Option<Value>> {
            Err(CacheError::Storage("get failed".into()))
        }
        async fn set(&self, _: &str, _: Value, _: u64) -> Result<()> {
            Err(CacheError::Storage("set failed".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool> {
            Err(CacheError::Storage("delete failed".into()))
        }
        async fn delete_pattern(&self, _: &str) -> Result<usize> {
            Err(CacheError::Storage("delete failed".into()))
        }
        async fn exists(&self, _: &str) -> Result<bool> {
            Err(CacheError::Storage("exists failed".into()))
        }
        async fn clear(&self) -> Result<()> {
            Err(CacheError::Storage("clear failed".into()))
        }
        async fn increment_bounded(&self, _: &str, _: u64, _: u64) -> Result<BoundedIncrement> {
            Err(CacheError::Storage("incr failed".into()))
        }
    }

    #[tokio::test]
    async fn test_window_boundary() {
        let (limiter, clock, _) = setup(Duration::from_millis(1000), 3);

        let remaining: Vec<_> = [
            limiter.is_allowed_for_key("k").await,
            limiter.is_allowed_for_key("k").await,
            limiter.is_allowed_for_key("k").await,
        ]
        .iter()
        .map(|r| {
            assert!(r.allowed);
            r.remaining
        })
        .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let fourth = limiter.is_allowed_for_key("k").await;
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert_eq!(fourth.total_hits, 3);

        clock.advance(Duration::from_millis(1000));
        let next = limiter.is_allowed_for_key("k").await;
        assert!(next.allowed);
        assert_eq!(next.total_hits, 1);
        assert_eq!(next.remaining, 2);
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let (limiter, _, _) = setup(Duration::from_secs(60), 2);

        let first = limiter.is_allowed_for_key("ip:1.2.3.4").await;
        let second = limiter.is_allowed_for_key("ip:1.2.3.4").await;
        let third = limiter.is_allowed_for_key("ip:1.2.3.4").await;

        assert!(first.allowed && second.allowed);
        assert_eq!(first.total_hits, 1);
        assert_eq!(second.total_hits, 2);
        assert!(!third.allowed);
        assert_eq!(third.total_hits, 2);
        assert_eq!(third.remaining, 0);
    }

    #[tokio::test]
    async fn test_reset_time_is_window_end() {
        let (limiter, clock, _) = setup(Duration::from_secs(60), 1);
        clock.advance(Duration::from_secs(15));

        let allowed = limiter.is_allowed_for_key("k").await;
        let blocked = limiter.is_allowed_for_key("k").await;

        assert_eq!(allowed.reset_time, START_MS + 60_000);
        assert_eq!(blocked.reset_time, START_MS + 60_000);
    }

    #[tokio::test]
    async fn test_windows_are_epoch_anchored() {
        let (limiter, clock, _) = setup(Duration::from_secs(60), 1);

        // First request late in the window still rolls over at the boundary
        clock.advance(Duration::from_secs(59));
        assert!(limiter.is_allowed_for_key("k").await.allowed);
        assert!(!limiter.is_allowed_for_key("k").await.allowed);

        clock.advance(Duration::from_secs(1));
        assert!(limiter.is_allowed_for_key("k").await.allowed);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _, _) = setup(Duration::from_secs(60), 1);
        assert!(limiter.is_allowed_for_key("a").await.allowed);
        assert!(limiter.is_allowed_for_key("b").await.allowed);
        assert!(!limiter.is_allowed_for_key("a").await.allowed);
    }

    #[tokio::test]
    async fn test_counter_expires_with_window() {
        let (limiter, clock, cache) = setup(Duration::from_secs(60), 5);
        limiter.is_allowed_for_key("k").await;
        assert_eq!(cache.len().await, 1);

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.sweep_now().await, 1);
    }

    #[tokio::test]
    async fn test_retry_after_rounds_up() {
        let (limiter, clock, _) = setup(Duration::from_secs(60), 1);
        clock.advance(Duration::from_millis(30_500));

        let result = limiter.is_allowed_for_key("k").await;
        assert_eq!(limiter.retry_after_secs(&result), 30);

        clock.advance(Duration::from_millis(29_000));
        assert_eq!(limiter.retry_after_secs(&result), 1);
    }

    #[tokio::test]
    async fn test_fail_open() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let limiter = RateLimiter::new(
            RateLimitConfig::new(Duration::from_secs(60), 10),
            Arc::new(BrokenBackend),
            clock,
        );

        for _ in 0..20 {
            let result = limiter.is_allowed_for_key("k").await;
            assert!(result.allowed);
            assert_eq!(result.remaining, 9);
        }
        assert_eq!(limiter.stats().fail_open, 20);
    }

    #[tokio::test]
    async fn test_on_limit_reached_callback() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let config = RateLimitConfig::new(Duration::from_secs(60), 1).on_limit_reached(move |key| {
            assert_eq!(key, "k");
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let limiter = RateLimiter::new(config, Arc::new(MemoryCache::new(clock.clone())), clock);

        limiter.is_allowed_for_key("k").await;
        limiter.is_allowed_for_key("k").await;
        limiter.is_allowed_for_key("k").await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        let stats = limiter.stats();
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.blocked, 2);
    }

    #[tokio::test]
    async fn test_ip_limiter_namespaces_keys() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let limiter = IpRateLimiter::new(
            RateLimitConfig::new(Duration::from_secs(60), 1),
            cache.clone(),
            clock,
        );

        let req = Request::builder()
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        assert!(limiter.check(&req).await.allowed);
        assert!(!limiter.check_ip("1.2.3.4").await.allowed);

        let window = START_MS / 60_000;
        let key = format!("rate_limit:1.2.3.4:{}", window);
        assert!(cache.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_scoped_ip_limiters_keep_separate_counters() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let config = RateLimitConfig::new(Duration::from_secs(60), 1);
        let search = IpRateLimiter::scoped("search", config.clone(), cache.clone(), clock.clone());
        let admin = IpRateLimiter::scoped("admin", config, cache.clone(), clock);

        assert!(search.check_ip("1.2.3.4").await.allowed);
        assert!(admin.check_ip("1.2.3.4").await.allowed);
        assert!(!search.check_ip("1.2.3.4").await.allowed);

        let key = format!("rate_limit:admin:1.2.3.4:{}", START_MS / 60_000);
        assert!(cache.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_limiter_namespaces_keys() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let limiter = UserRateLimiter::new(
            RateLimitConfig::new(Duration::from_secs(60), 2),
            cache.clone(),
            clock,
        );

        assert_eq!(limiter.check_user("u1").await.remaining, 1);
        assert_eq!(limiter.check_user("u2").await.remaining, 1);

        let key = format!("user_rate_limit:u1:{}", START_MS / 60_000);
        assert!(cache.exists(&key).await.unwrap());
    }
}
