//! Cache key helpers.
//!
//! Keys follow `<prefix>:<suffix>` so invalidation can target a prefix with
//! a single glob.

use std::collections::BTreeMap;

use axum::http::Uri;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

/// Builds `<prefix>:<base64(json of params sorted by name)>`.
///
/// Parameter order never affects the key.
pub fn cache_key<'a, I>(prefix: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let sorted: BTreeMap<&str, Value> = params.into_iter().collect();
    // A map of strings to Values always serializes
    let json = serde_json::to_string(&sorted).unwrap_or_default();
    format!("{}:{}", prefix, STANDARD.encode(json))
}

/// Builds `<prefix>:<path?query>` for an HTTP request URI.
pub fn url_key(prefix: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{}:{}", prefix, path_and_query)
}
