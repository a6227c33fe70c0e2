//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Interval in seconds between passive sweeps of expired entries
    pub cleanup_interval: u64,
    /// TTL in seconds for cached listing responses
    pub default_cache_ttl: u64,
    /// TTL in seconds for cached search responses
    pub search_cache_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `DEFAULT_CACHE_TTL` - Listing response TTL in seconds (default: 300)
    /// - `SEARCH_CACHE_TTL` - Search response TTL in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            default_cache_ttl: env_or("DEFAULT_CACHE_TTL", defaults.default_cache_ttl),
            search_cache_ttl: env_or("SEARCH_CACHE_TTL", defaults.search_cache_ttl),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: crate::cache::DEFAULT_SWEEP_INTERVAL_SECS,
            default_cache_ttl: 300,
            search_cache_ttl: 60,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
