//! API Routes
//!
//! Configures the Axum router with all operations endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    category_stats_handler, flush_all_handler, flush_category_handler, health_handler,
    logout_handler, revoke_handler, revoke_subject_handler, stats_handler, AppState,
};
use crate::auth::require_session;

/// Creates the public router, served on every interface.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `POST /auth/logout` - Revoke the caller's own token (bearer required)
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let session = middleware::from_fn_with_state(state.verifier.clone(), require_session);

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/logout", post(logout_handler).route_layer(session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the operations router, served on the loopback admin listener only.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /cache/stats` - Aggregate and per-category cache statistics
/// - `GET /cache/stats/:category` - Statistics for one category
/// - `DELETE /cache` - Flush every category
/// - `DELETE /cache/:category` - Flush one category
/// - `POST /revocations` - Revoke a token
/// - `POST /revocations/subjects/:subject_id` - Revoke every token of a subject
pub fn create_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/cache", delete(flush_all_handler))
        .route("/cache/:category", delete(flush_category_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/stats/:category", get(category_stats_handler))
        .route("/revocations", post(revoke_handler))
        .route(
            "/revocations/subjects/:subject_id",
            post(revoke_subject_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
