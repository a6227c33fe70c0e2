//! Response DTOs for the demo API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::invalidation::InvalidationReport;
use crate::ratelimit::RateLimitStats;

/// Body of a request rejected by the rate limiter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedResponse {
    pub success: bool,
    pub error: String,
    pub rate_limited: bool,
}

impl RateLimitedResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            rate_limited: true,
        }
    }
}

/// Per-limiter counters reported by `GET /stats`.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitReport {
    pub public: RateLimitStats,
    pub search: RateLimitStats,
    pub admin: RateLimitStats,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub rate_limits: RateLimitReport,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, rate_limits: RateLimitReport) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            rate_limits,
        }
    }
}

/// Response body for the admin invalidation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub entity: String,
    pub id: Option<String>,
    pub deleted: usize,
    pub failed: usize,
}

impl InvalidateResponse {
    pub fn new(entity: impl Into<String>, id: Option<String>, report: InvalidationReport) -> Self {
        Self {
            entity: entity.into(),
            id,
            deleted: report.deleted,
            failed: report.failed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
