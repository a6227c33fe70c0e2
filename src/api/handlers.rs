//! API Handlers
//!
//! HTTP request handlers for the demo endpoints. Caching and rate limiting
//! are applied by the router, not here.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{CacheError, Result};
use crate::invalidation::ENTITY_TYPES;
use crate::models::{
    HealthResponse, InvalidateQuery, InvalidateResponse, RateLimitReport, SearchQuery,
    StatsResponse,
};

use super::AppState;

/// SWR key for the hotel catalog. Lives under `hotels:list:` so any hotel
/// write invalidates it.
pub const CATALOG_KEY: &str = "hotels:list:catalog";

// == Catalog ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: u32,
    pub name: String,
    pub city: String,
    pub rating: f32,
}

/// Stand-in for the database query behind the listings.
async fn load_hotels() -> Result<Vec<Hotel>> {
    let rows = [
        (1, "Harbour View Lodge", "Wellington", 4.5),
        (2, "Alpine Spa Retreat", "Queenstown", 4.8),
        (3, "Riverside Inn", "Christchurch", 4.1),
        (4, "Coastal Spa Hotel", "Napier", 4.3),
    ];
    Ok(rows
        .into_iter()
        .map(|(id, name, city, rating)| Hotel {
            id,
            name: name.to_string(),
            city: city.to_string(),
            rating,
        })
        .collect())
}

async fn catalog(state: &AppState) -> Result<Vec<Hotel>> {
    let ttl = state.config.default_cache_ttl;
    state
        .swr
        .get_with_swr(CATALOG_KEY, load_hotels, ttl, ttl / 2)
        .await
}

/// Handler for GET /api/hotels
pub async fn list_hotels(State(state): State<AppState>) -> Result<Json<Value>> {
    let hotels = catalog(&state).await?;
    Ok(Json(json!({
        "success": true,
        "count": hotels.len(),
        "data": hotels,
    })))
}

/// Handler for GET /api/search?q=
///
/// Case-insensitive match on hotel name or city.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let needle = query.q.trim().to_lowercase();
    let results: Vec<Hotel> = catalog(&state)
        .await?
        .into_iter()
        .filter(|h| h.name.to_lowercase().contains(&needle) || h.city.to_lowercase().contains(&needle))
        .collect();

    Ok(Json(json!({
        "success": true,
        "query": query.q,
        "count": results.len(),
        "data": results,
    })))
}

/// Handler for POST /api/admin/invalidate/:entity
pub async fn invalidate_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<InvalidateResponse>> {
    if !ENTITY_TYPES.contains(&entity.as_str()) {
        return Err(CacheError::InvalidRequest(format!(
            "Unknown entity type '{}'",
            entity
        )));
    }

    let report = state
        .invalidation
        .invalidate_entity(&entity, query.id.as_deref())
        .await;
    info!(entity = %entity, id = ?query.id, deleted = report.deleted, "Admin invalidation");

    Ok(Json(InvalidateResponse::new(entity, query.id, report)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let limits = RateLimitReport {
        public: state.limiters.public.limiter().stats(),
        search: state.limiters.search.limiter().stats(),
        admin: state.limiters.admin.limiter().stats(),
    };
    Json(StatsResponse::new(state.cache.stats().await, limits))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
