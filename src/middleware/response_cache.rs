//! Response cache middleware
//!
//! Caches successful JSON responses of wrapped routes and replays them until
//! their TTL runs out.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::cache::{url_key, SharedBackend};
use crate::middleware::X_CACHE_STATUS;

/// Derives the cache key for a request.
pub type CacheKeyFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;
/// Decides whether a request bypasses the cache.
pub type SkipCacheFn = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

// == Cache Status ==
/// Value of the `X-Cache-Status` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
    Error,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
            Self::Error => "ERROR",
        }
    }

    fn tag(self, response: &mut Response) {
        response
            .headers_mut()
            .insert(X_CACHE_STATUS, HeaderValue::from_static(self.as_str()));
    }
}

// == Options ==
#[derive(Clone)]
pub struct ResponseCacheOptions {
    /// Lifetime of stored responses in seconds
    pub ttl_seconds: u64,
    /// Prefix for the default `<prefix>:<uri>` key
    pub key_prefix: String,
    pub cache_key_fn: Option<CacheKeyFn>,
    pub skip_cache_fn: Option<SkipCacheFn>,
}

impl ResponseCacheOptions {
    pub fn new(key_prefix: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            key_prefix: key_prefix.into(),
            cache_key_fn: None,
            skip_cache_fn: None,
        }
    }

    pub fn with_cache_key<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.cache_key_fn = Some(Arc::new(f));
        self
    }

    pub fn with_skip<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.skip_cache_fn = Some(Arc::new(f));
        self
    }
}

/// Stored form of a response.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    data: Value,
    status: u16,
    headers: BTreeMap<String, String>,
}

// == Response Cache ==
/// Middleware state: where to cache and how.
#[derive(Clone)]
pub struct ResponseCache {
    backend: SharedBackend,
    options: Arc<ResponseCacheOptions>,
}

impl ResponseCache {
    pub fn new(backend: SharedBackend, options: ResponseCacheOptions) -> Self {
        Self {
            backend,
            options: Arc::new(options),
        }
    }

    fn should_skip(&self, req: &Request) -> bool {
        match &self.options.skip_cache_fn {
            Some(skip) => skip(req),
            None => req.method() != Method::GET,
        }
    }

    fn key_for(&self, req: &Request) -> String {
        match &self.options.cache_key_fn {
            Some(key_fn) => key_fn(req),
            None => url_key(&self.options.key_prefix, req.uri()),
        }
    }

    async fn lookup(&self, key: &str) -> crate::error::Result<Option<CachedResponse>> {
        let Some(value) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(cached) => Ok(Some(cached)),
            Err(err) => {
                warn!(key, error = %err, "Discarding malformed cached response");
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &str, response: Response) -> Response {
        if !response.status().is_success() {
            let mut response = response;
            CacheStatus::Bypass.tag(&mut response);
            return response;
        }

        let (parts, body) = response.into_parts();
        let bytes = match to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(key, error = %err, "Failed to read response body");
                let mut response = Response::from_parts(parts, Body::empty());
                CacheStatus::Error.tag(&mut response);
                return response;
            }
        };

        let data: Value = match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!(key, error = %err, "Response body is not JSON, not caching");
                let mut response = Response::from_parts(parts, Body::from(bytes));
                CacheStatus::Bypass.tag(&mut response);
                return response;
            }
        };

        let cached = CachedResponse {
            data,
            status: parts.status.as_u16(),
            headers: storable_headers(&parts.headers),
        };

        match serde_json::to_value(&cached) {
            Ok(value) => {
                if let Err(err) = self.backend.set(key, value, self.options.ttl_seconds).await {
                    warn!(key, error = %err, "Failed to store response");
                }
            }
            Err(err) => warn!(key, error = %err, "Failed to serialize response"),
        }

        self.rebuild(cached, CacheStatus::Miss)
    }

    fn rebuild(&self, cached: CachedResponse, status: CacheStatus) -> Response {
        let code = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
        let mut response = (code, Json(cached.data)).into_response();

        status.tag(&mut response);
        let cache_control = format!("public, s-maxage={}", self.options.ttl_seconds);
        if let Ok(value) = HeaderValue::from_str(&cache_control) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }

        let headers = response.headers_mut();
        for (name, value) in cached.headers {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) else {
                continue;
            };
            if !headers.contains_key(&name) {
                headers.insert(name, value);
            }
        }

        response
    }
}

/// Headers worth replaying. The body is re-serialized, so its length is not kept.
fn storable_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| **name != header::CONTENT_LENGTH)
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

// == Middleware ==
/// Serves cached JSON responses and caches successful fresh ones.
///
/// ```ignore
/// let cache = ResponseCache::new(backend, ResponseCacheOptions::new("hotels:list", 300));
/// Router::new()
///     .route("/api/hotels", get(list_hotels))
///     .route_layer(middleware::from_fn_with_state(cache, cache_response));
/// ```
pub async fn cache_response(State(cache): State<ResponseCache>, req: Request, next: Next) -> Response {
    if cache.should_skip(&req) {
        return next.run(req).await;
    }

    let key = cache.key_for(&req);
    match cache.lookup(&key).await {
        Ok(Some(cached)) => {
            debug!(key, "Response cache hit");
            return cache.rebuild(cached, CacheStatus::Hit);
        }
        Ok(None) => debug!(key, "Response cache miss"),
        Err(err) => {
            error!(key, error = %err, "Response cache lookup failed, calling handler directly");
            let mut response = next.run(req).await;
            CacheStatus::Error.tag(&mut response);
            return response;
        }
    }

    let response = next.run(req).await;
    cache.store(&key, response).await
}
