//! HTTP middleware around application handlers.
//!
//! - `cache_response`: read-through caching of GET responses per category
//! - `invalidate_on_mutation`: flushes a category after a successful write

mod invalidate;
mod response_cache;

pub use invalidate::{invalidate_on_mutation, MutationInvalidator};
pub use response_cache::{cache_response, ResponseCache, TtlPolicy, X_CACHE};
