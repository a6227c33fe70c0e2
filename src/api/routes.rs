//! API Routes
//!
//! Configures the Axum router, wiring the cache and rate-limit middleware
//! in front of the demo handlers.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::{cache_response, rate_limit, ResponseCache, ResponseCacheOptions};

use super::handlers::{
    health_handler, invalidate_entity, list_hotels, search, stats_handler,
};
use super::AppState;

/// Key prefix for cached hotel listings.
pub const HOTELS_CACHE_PREFIX: &str = "hotels:list";
/// Key prefix for cached search responses.
pub const SEARCH_CACHE_PREFIX: &str = "search";

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache and rate-limit counters
/// - `GET /api/hotels` - Cached listing, public limit
/// - `GET /api/search?q=` - Cached search, search limit
/// - `POST /api/admin/invalidate/:entity?id=` - Admin limit
///
/// Rate limiting runs before the response cache, so cache hits still count
/// against the caller's quota.
pub fn create_router(state: AppState) -> Router {
    let hotels_cache = ResponseCache::new(
        state.backend.clone(),
        ResponseCacheOptions::new(HOTELS_CACHE_PREFIX, state.config.default_cache_ttl),
    );
    let search_cache = ResponseCache::new(
        state.backend.clone(),
        ResponseCacheOptions::new(SEARCH_CACHE_PREFIX, state.config.search_cache_ttl),
    );

    let hotels = Router::new()
        .route("/api/hotels", get(list_hotels))
        .route_layer(from_fn_with_state(hotels_cache, cache_response))
        .route_layer(from_fn_with_state(state.limiters.public.limiter(), rate_limit));

    let search_routes = Router::new()
        .route("/api/search", get(search))
        .route_layer(from_fn_with_state(search_cache, cache_response))
        .route_layer(from_fn_with_state(state.limiters.search.limiter(), rate_limit));

    let admin = Router::new()
        .route("/api/admin/invalidate/:entity", post(invalidate_entity))
        .route_layer(from_fn_with_state(state.limiters.admin.limiter(), rate_limit));

    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .merge(hotels)
        .merge(search_routes)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
