//! Session verification middleware.
//!
//! Revocation is checked before anything else on every authenticated request;
//! a revoked token is rejected even if it would otherwise decode fine.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::auth::{bearer_token, ClaimsDecoder, Session};
use crate::error::{GuardError, Result};
use crate::revocation::{hash_prefix, token_hash, RevocationStore};

#[derive(Clone)]
pub struct SessionVerifier {
    revocations: Arc<RevocationStore>,
    decoder: Arc<dyn ClaimsDecoder>,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("revocations", &self.revocations)
            .finish_non_exhaustive()
    }
}

impl SessionVerifier {
    pub fn new(revocations: Arc<RevocationStore>, decoder: Arc<dyn ClaimsDecoder>) -> Self {
        Self {
            revocations,
            decoder,
        }
    }

    pub fn revocations(&self) -> &Arc<RevocationStore> {
        &self.revocations
    }

    /// Verifies `token`: revocation first, then decoding and expiry.
    pub async fn verify(&self, token: &str) -> Result<Session> {
        if self.revocations.is_revoked(token).await {
            warn!(
                token_hash = %hash_prefix(&token_hash(token)),
                "Rejected revoked token"
            );
            return Err(GuardError::TokenRevoked);
        }

        let claims = self.decoder.decode(token)?;
        if claims.expires_at <= Utc::now() {
            return Err(GuardError::InvalidToken("token expired".to_string()));
        }

        Ok(Session::new(token, claims))
    }
}

/// Axum middleware guarding routes that need a live session.
///
/// On success the `Session` is available to handlers as `Extension<Session>`.
pub async fn require_session(
    State(verifier): State<SessionVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers())
        .ok_or(GuardError::MissingCredentials)?
        .to_string();

    let session = verifier.verify(&token).await?;
    debug!(subject_id = ?session.subject_id, "Session verified");

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
