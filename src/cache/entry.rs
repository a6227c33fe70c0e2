//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Caller-supplied lifetime in seconds
    pub ttl_seconds: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stored at `now_ms`.
    pub fn new(value: Value, ttl_seconds: u64, now_ms: u64) -> Self {
        Self {
            value,
            stored_at: now_ms,
            ttl_seconds,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was stored.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at)
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry expires once its age is strictly greater than its TTL. A TTL
    /// of zero is expired from the moment it is stored.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.ttl_seconds == 0 || self.age_ms(now_ms) > self.ttl_ms()
    }

    /// TTL in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_seconds.saturating_mul(1000)
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        if self.is_expired(now_ms) {
            0
        } else {
            self.ttl_ms() - self.age_ms(now_ms)
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_fresh() {
        let entry = CacheEntry::new(json!("v"), 60, 1_000);
        assert!(!entry.is_expired(1_000));
        assert_eq!(entry.ttl_remaining_ms(1_000), 60_000);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(json!(1), 1, 0);

        // Age equal to the TTL is still live, one millisecond later is not
        assert!(!entry.is_expired(1_000));
        assert!(entry.is_expired(1_001));
        assert_eq!(entry.ttl_remaining_ms(1_001), 0);
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new(json!({"a": 1}), 0, 5_000);
        assert!(entry.is_expired(5_000));
    }

    #[test]
    fn test_clock_behind_store_time() {
        // A clock that moved backwards must not underflow
        let entry = CacheEntry::new(json!(null), 10, 5_000);
        assert_eq!(entry.age_ms(4_000), 0);
        assert!(!entry.is_expired(4_000));
    }
}
