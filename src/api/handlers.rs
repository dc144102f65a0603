//! API Handlers
//!
//! HTTP request handlers for the operations API: cache statistics and
//! flushes, revocations and logout.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use tracing::info;

use crate::auth::{ClaimsDecoder, OpaqueTokenDecoder, Session, SessionVerifier};
use crate::cache::TtlCache;
use crate::error::{GuardError, Result};
use crate::models::{
    CacheReport, FlushResponse, HealthResponse, RevokeRequest, RevokeResponse,
    RevokeSubjectRequest, RevokeSubjectResponse, StatsResponse,
};
use crate::revocation::RevocationStore;
use crate::service::GuardService;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: TtlCache,
    pub revocations: Arc<RevocationStore>,
    pub verifier: SessionVerifier,
    /// Default revocation TTL when a request does not give one
    pub token_lifetime: Duration,
}

impl AppState {
    /// Creates a new AppState over the service's components.
    pub fn new(
        service: &GuardService,
        decoder: Arc<dyn ClaimsDecoder>,
        token_lifetime: Duration,
    ) -> Self {
        let revocations = Arc::clone(service.revocations());
        Self {
            cache: service.cache().clone(),
            verifier: SessionVerifier::new(Arc::clone(&revocations), decoder),
            revocations,
            token_lifetime,
        }
    }

    /// Creates a new AppState from configuration, accepting opaque tokens.
    pub fn from_config(service: &GuardService, config: &crate::config::Config) -> Self {
        Self::new(
            service,
            Arc::new(OpaqueTokenDecoder::new(config.token_lifetime)),
            config.token_lifetime,
        )
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.revocations.mirror().len()))
}

/// Handler for GET /cache/stats
///
/// Returns the aggregate over all categories plus a per-category breakdown.
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheReport> {
    let total = state.cache.stats(None).unwrap_or_default();
    let categories = state
        .cache
        .stats_by_category()
        .into_iter()
        .map(|(name, stats)| StatsResponse::new(Some(&name), stats))
        .collect();

    Json(CacheReport {
        total: StatsResponse::new(None, total),
        categories,
    })
}

/// Handler for GET /cache/stats/:category
pub async fn category_stats_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<StatsResponse>> {
    let stats = state
        .cache
        .stats(Some(&category))
        .ok_or_else(|| GuardError::NotFound(format!("cache category '{category}'")))?;

    Ok(Json(StatsResponse::new(Some(&category), stats)))
}

/// Handler for DELETE /cache
pub async fn flush_all_handler(State(state): State<AppState>) -> Json<FlushResponse> {
    let removed = state.cache.flush_all();
    info!(removed, "Flushed all cache categories");
    Json(FlushResponse::new(None, removed))
}

/// Handler for DELETE /cache/:category
///
/// Unknown categories flush nothing and still succeed.
pub async fn flush_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<FlushResponse> {
    let removed = state.cache.flush_category(&category);
    info!(category = %category, removed, "Flushed cache category");
    Json(FlushResponse::new(Some(&category), removed))
}

/// Handler for POST /revocations
///
/// Always succeeds once validated: a failed durable write is retried in the
/// background while the revocation is enforced from memory.
pub async fn revoke_handler(
    State(state): State<AppState>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(GuardError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl_seconds
        .map(Duration::from_secs)
        .unwrap_or(state.token_lifetime);
    let reason = req.reason_or_default();

    state
        .revocations
        .revoke(&req.token, req.subject_id.as_deref(), reason, ttl)
        .await;

    Ok(Json(RevokeResponse::new(reason, ttl.as_secs())))
}

/// Handler for POST /revocations/subjects/:subject_id
///
/// The body is optional; an empty body uses the default reason.
pub async fn revoke_subject_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    body: Bytes,
) -> Result<Json<RevokeSubjectResponse>> {
    let req: RevokeSubjectRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RevokeSubjectRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| GuardError::InvalidRequest(format!("Malformed body: {err}")))?
    };

    if let Some(error_msg) = crate::models::requests::validate_label("Subject id", &subject_id)
        .or_else(|| req.validate())
    {
        return Err(GuardError::InvalidRequest(error_msg));
    }

    let reason = req.reason_or_default();
    let revoked = state
        .revocations
        .revoke_all_for_subject(&subject_id, reason)
        .await?;

    Ok(Json(RevokeSubjectResponse {
        subject_id,
        reason: reason.to_string(),
        revoked,
    }))
}

/// Handler for POST /auth/logout
///
/// Revokes the caller's own token until it would have expired anyway.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<RevokeResponse> {
    let ttl = session.remaining_lifetime(Utc::now());

    state
        .revocations
        .revoke(session.token(), session.subject_id.as_deref(), "logout", ttl)
        .await;

    info!(subject_id = ?session.subject_id, "Session logged out");
    Json(RevokeResponse::new("logout", ttl.as_secs()))
}
