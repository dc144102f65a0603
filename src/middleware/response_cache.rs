//! Read-through response caching for GET handlers.
//!
//! Wraps the handler itself: a hit short-circuits and the handler never runs;
//! a miss runs the handler and stores its body only when the status is 2xx,
//! the body is JSON, and the category was not flushed while the handler ran.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{cache_key, TtlCache};
use crate::error::GuardError;

/// Response header reporting `HIT` or `MISS`.
pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

type TtlFn = dyn Fn(&Request) -> Duration + Send + Sync;

// == TTL Policy ==
/// How long a stored response lives.
#[derive(Clone, Default)]
pub enum TtlPolicy {
    /// The category's configured TTL
    #[default]
    Category,
    /// A fixed TTL for this route
    Fixed(Duration),
    /// Computed from the request, e.g. shorter close to a deadline
    Dynamic(Arc<TtlFn>),
}

impl TtlPolicy {
    fn resolve(&self, request: &Request) -> Option<Duration> {
        match self {
            TtlPolicy::Category => None,
            TtlPolicy::Fixed(ttl) => Some(*ttl),
            TtlPolicy::Dynamic(compute) => Some(compute(request)),
        }
    }
}

impl fmt::Debug for TtlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlPolicy::Category => f.write_str("Category"),
            TtlPolicy::Fixed(ttl) => f.debug_tuple("Fixed").field(ttl).finish(),
            TtlPolicy::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

// == Response Cache ==
/// Middleware state for one cached read route.
///
/// ```ignore
/// Router::new().route(
///     "/proposals",
///     get(list_proposals).route_layer(middleware::from_fn_with_state(
///         ResponseCache::new(cache.clone(), "proposals"),
///         cache_response,
///     )),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ResponseCache {
    cache: TtlCache,
    category: Arc<str>,
    ttl: TtlPolicy,
}

impl ResponseCache {
    pub fn new(cache: TtlCache, category: impl Into<Arc<str>>) -> Self {
        Self {
            cache,
            category: category.into(),
            ttl: TtlPolicy::Category,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = TtlPolicy::Fixed(ttl);
        self
    }

    #[must_use]
    pub fn with_dynamic_ttl<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Request) -> Duration + Send + Sync + 'static,
    {
        self.ttl = TtlPolicy::Dynamic(Arc::new(compute));
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// Axum middleware serving and filling the cache for GET requests.
pub async fn cache_response(
    State(policy): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = cache_key(request.uri().path(), request.uri().query());

    if let Some(value) = policy.cache.get(&policy.category, &key) {
        debug!(category = %policy.category, key = %key, "Serving cached response");
        return ([(X_CACHE.clone(), HeaderValue::from_static("HIT"))], Json(value))
            .into_response();
    }

    // A flush while the handler runs invalidates whatever it read
    let generation = policy.cache.generation(&policy.category);
    let ttl = policy.ttl.resolve(&request);
    let response = next.run(request).await;

    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(category = %policy.category, key = %key, error = %err, "Failed to buffer response body");
            return GuardError::Internal("failed to read response body".to_string())
                .into_response();
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => {
            let stored = generation.is_some_and(|generation| {
                policy
                    .cache
                    .set_if_generation(&policy.category, generation, key.clone(), value, ttl)
            });
            if !stored {
                debug!(category = %policy.category, key = %key, "Response not cached");
            }
        }
        Err(err) => {
            warn!(
                category = %policy.category,
                key = %key,
                error = %err,
                "Response body is not JSON, not caching"
            );
        }
    }

    parts
        .headers
        .insert(X_CACHE.clone(), HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}
