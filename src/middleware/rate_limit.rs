//! Rate limit middleware
//!
//! Rejects requests over quota with 429 and annotates admitted responses
//! with their remaining quota.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::middleware::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::models::RateLimitedResponse;
use crate::ratelimit::{RateLimitResult, RateLimiter};

/// Admits or rejects the request according to `limiter`.
///
/// ```ignore
/// let limiter = Arc::new(RateLimiter::new(RateLimitPreset::Search.config(), backend, clock));
/// Router::new()
///     .route("/api/search", get(search))
///     .route_layer(middleware::from_fn_with_state(limiter, rate_limit));
/// ```
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let result = limiter.is_allowed(&req).await;
    let config = limiter.config();

    let retry_after = (!result.allowed).then(|| limiter.retry_after_secs(&result));
    let headers = match limit_headers(config.max_requests, &result, retry_after) {
        Ok(headers) => headers,
        Err(err) => {
            warn!(error = %err, "Failed to build rate limit headers, allowing request");
            return next.run(req).await;
        }
    };

    if !result.allowed {
        debug!(uri = %req.uri(), "Request rejected by rate limiter");
        let body = Json(RateLimitedResponse::new(config.message.clone()));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        response.headers_mut().extend(headers);
        return response;
    }

    let mut response = next.run(req).await;
    response.headers_mut().extend(headers);
    response
}

fn limit_headers(limit: u32, result: &RateLimitResult, retry_after: Option<u64>) -> Result<HeaderMap> {
    let reset = DateTime::<Utc>::from_timestamp_millis(result.reset_time as i64)
        .ok_or_else(|| CacheError::Internal(format!("reset time {} out of range", result.reset_time)))?
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from_str(&reset).map_err(|e| CacheError::Internal(e.to_string()))?,
    );
    if let Some(seconds) = retry_after {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(seconds));
    }
    Ok(headers)
}
