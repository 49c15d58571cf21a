//! Cache Module
//!
//! Provides the bounded in-memory response cache with TTL expiration,
//! insertion-order eviction, canonical key building and get-or-populate
//! helpers.

mod cached;
mod entry;
mod key;
mod order;
mod stats;
mod store;


// Re-export public types
pub use cached::{PreloadRequest, ResponseCache};
pub use entry::CacheEntry;
pub use key::{cache_key, KEY_DELIMITER};
pub use order::InsertionOrder;
pub use stats::CacheStats;
pub use store::TtlCache;

// == Public Constants ==
/// Default capacity of the response cache
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default TTL applied when a caller does not pass one
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(5 * 60);
