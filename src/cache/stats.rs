//! Cache Statistics Module
//!
//! Lookup, write and removal counters kept by the store.

use serde::Serialize;

/// Why entries left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// `delete`, `delete_pattern` or `clear`
    Deleted,
    /// TTL ran out, found lazily or by the sweeper
    Expired,
}

// == Cache Stats ==
/// Point-in-time view of cache activity, as served by `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub expirations: u64,
    /// Stored entries when the snapshot was taken
    pub total_entries: usize,
}

impl CacheStats {
    /// hits / (hits + misses), or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub(crate) fn record_set(&mut self) {
        self.sets += 1;
    }

    pub(crate) fn record_removed(&mut self, removal: Removal, count: usize) {
        let counter = match removal {
            Removal::Deleted => &mut self.deletes,
            Removal::Expired => &mut self.expirations,
        };
        *counter += count as u64;
    }

    /// Copy of the counters with the current entry count filled in.
    pub(crate) fn snapshot(&self, total_entries: usize) -> Self {
        Self {
            total_entries,
            ..self.clone()
        }
    }
}
