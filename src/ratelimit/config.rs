//! Rate limit configuration and conventional presets.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::HeaderMap;

/// Derives the logical rate-limit key from a request.
pub type KeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Invoked with the logical key whenever a request is rejected.
pub type LimitReachedCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";

// == Rate Limit Config ==
/// Fixed-window rate limit settings.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Window length
    pub window: Duration,
    /// Requests admitted per key per window
    pub max_requests: u32,
    /// Request to logical key
    pub key_generator: KeyGenerator,
    /// Message returned to rejected clients
    pub message: String,
    /// Hook run on every rejection
    pub on_limit_reached: Option<LimitReachedCallback>,
}

impl RateLimitConfig {
    /// Creates a config keyed by client IP with the default message.
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            key_generator: Arc::new(|req: &Request| client_ip(req.headers())),
            message: DEFAULT_MESSAGE.to_string(),
            on_limit_reached: None,
        }
    }

    pub fn with_key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(f);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn on_limit_reached<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_limit_reached = Some(Arc::new(f));
        self
    }

    /// Window length in milliseconds, never zero.
    pub fn window_ms(&self) -> u64 {
        (self.window.as_millis() as u64).max(1)
    }

    /// Counter TTL: the window length rounded up to whole seconds.
    pub fn counter_ttl_seconds(&self) -> u64 {
        self.window_ms().div_ceil(1000)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitPreset::Public.config()
    }
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .field("message", &self.message)
            .field("on_limit_reached", &self.on_limit_reached.is_some())
            .finish_non_exhaustive()
    }
}

// == Presets ==
/// Conventional limits used by the route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPreset {
    /// Public read endpoints: 1000 requests per 15 minutes
    Public,
    /// Search: 60 requests per minute
    Search,
    /// Login and signup: 5 attempts per 15 minutes
    Auth,
    /// Reviews and other user submissions: 30 per minute
    UserContent,
    /// Admin dashboard: 100 per minute
    Admin,
}

impl RateLimitPreset {
    pub fn window(self) -> Duration {
        match self {
            Self::Public | Self::Auth => Duration::from_secs(15 * 60),
            Self::Search | Self::UserContent | Self::Admin => Duration::from_secs(60),
        }
    }

    pub fn max_requests(self) -> u32 {
        match self {
            Self::Public => 1000,
            Self::Search => 60,
            Self::Auth => 5,
            Self::UserContent => 30,
            Self::Admin => 100,
        }
    }

    pub fn config(self) -> RateLimitConfig {
        RateLimitConfig::new(self.window(), self.max_requests())
    }
}

// == Client IP ==
/// Caller IP from proxy headers.
///
/// First entry of `X-Forwarded-For`, else `X-Real-IP`, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or("unknown")
        .to_string()
}
