//! Glob Pattern Module
//!
//! Compiles `*`-glob patterns used for bulk invalidation into anchored regexes.

use regex::Regex;

use crate::error::Result;

// == Glob Pattern ==
/// A compiled key pattern where `*` matches any run of characters.
///
/// Every other character is literal, and the whole key must match, so
/// `"hotels"` only matches the key `"hotels"` while `"hotels:*"` matches
/// every key under that prefix.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a glob pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if `key` matches the pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
