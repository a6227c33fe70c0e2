//! Background Tasks
//!
//! Periodic work attached to a [`MemoryCache`](crate::cache::MemoryCache).
//! Currently only the TTL sweep, started by `MemoryCache::start_sweeper`.

mod cleanup;

pub use cleanup::spawn_cleanup_task;
