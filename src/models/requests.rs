//! Request DTOs for the demo API
//!
//! Query strings accepted by the cached and admin routes.

use serde::Deserialize;

/// Query for `GET /api/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

impl SearchQuery {
    /// Returns an error message if the query is unusable, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.q.trim().is_empty() {
            return Some("Search query cannot be empty".to_string());
        }
        if self.q.len() > 200 {
            return Some("Search query exceeds maximum length of 200 characters".to_string());
        }
        None
    }
}

/// Query for `POST /api/admin/invalidate/:entity`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateQuery {
    /// Entity id; absent means every entity of the type
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_deserialize() {
        let query: SearchQuery = serde_json::from_str(r#"{"q": "spa"}"#).unwrap();
        assert_eq!(query.q, "spa");
        assert!(query.validate().is_none());
    }

    #[test]
    fn test_validate_blank_query() {
        let query = SearchQuery { q: "   ".to_string() };
        assert!(query.validate().is_some());
    }

    #[test]
    fn test_validate_long_query() {
        let query = SearchQuery { q: "x".repeat(201) };
        assert!(query.validate().is_some());
    }

    #[test]
    fn test_invalidate_query_id_optional() {
        let query: InvalidateQuery = serde_json::from_str("{}").unwrap();
        assert!(query.id.is_none());

        let query: InvalidateQuery = serde_json::from_str(r#"{"id": "42"}"#).unwrap();
        assert_eq!(query.id.as_deref(), Some("42"));
    }
}
