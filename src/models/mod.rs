//! Request and Response models for the demo API
//!
//! DTOs used for serializing query strings and HTTP response bodies.

pub mod requests;
pub mod responses;

pub use requests::{InvalidateQuery, SearchQuery};
pub use responses::{
    ErrorResponse, HealthResponse, InvalidateResponse, RateLimitReport, RateLimitedResponse,
    StatsResponse,
};
