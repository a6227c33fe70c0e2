//! API Module
//!
//! Demo HTTP surface that exercises the cache, rate limiter and
//! invalidation under axum.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache and rate-limit statistics
//! - `GET /api/hotels` - Cached hotel listing
//! - `GET /api/search?q=` - Cached hotel search
//! - `POST /api/admin/invalidate/:entity` - Drop cached data for an entity

pub mod handlers;
pub mod routes;
pub mod state;

pub use handlers::*;
pub use routes::{create_router, HOTELS_CACHE_PREFIX, SEARCH_CACHE_PREFIX};
pub use state::{AppState, Limiters, RateLimits};
