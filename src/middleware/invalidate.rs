//! Category flush on successful writes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::cache::TtlCache;

/// Middleware state naming the category a write route invalidates.
#[derive(Debug, Clone)]
pub struct MutationInvalidator {
    cache: TtlCache,
    category: Arc<str>,
}

impl MutationInvalidator {
    pub fn new(cache: TtlCache, category: impl Into<Arc<str>>) -> Self {
        Self {
            cache,
            category: category.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// Runs the write handler, then flushes the whole category if it returned 2xx.
///
/// The response is never altered. Safe methods pass through untouched.
pub async fn invalidate_on_mutation(
    State(invalidator): State<MutationInvalidator>,
    request: Request,
    next: Next,
) -> Response {
    let is_write = !request.method().is_safe();
    let response = next.run(request).await;

    if is_write && response.status().is_success() {
        let removed = invalidator.cache.flush_category(&invalidator.category);
        debug!(category = %invalidator.category, removed, "Invalidated category after write");
    }

    response
}
