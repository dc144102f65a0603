//! Cache Module
//!
//! Provides the multi-category in-memory response cache with TTL expiration.

mod entry;
mod key;
mod registry;
mod stats;
mod store;
mod ttl_cache;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use key::cache_key;
pub use registry::{CategoryConfig, CategoryRegistry, DEFAULT_CATEGORIES, RESERVED_CATEGORY_NAMES};
pub use stats::CacheStats;
pub use store::CategoryStore;
pub use ttl_cache::TtlCache;
