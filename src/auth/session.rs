//! Bearer token extraction and claims decoding.

use std::fmt;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

use crate::error::{GuardError, Result};
use crate::revocation::expiry_after;

/// What a decoder learns from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub subject_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Turns a bearer token into claims. Signature and format checks live here.
pub trait ClaimsDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<SessionClaims>;
}

/// Accepts any non-blank token and assumes it lives `lifetime` from now.
///
/// Used when tokens are issued by another service and only revocation is
/// enforced locally.
#[derive(Debug, Clone, Copy)]
pub struct OpaqueTokenDecoder {
    lifetime: Duration,
}

impl OpaqueTokenDecoder {
    pub fn new(lifetime: Duration) -> Self {
        Self { lifetime }
    }
}

impl ClaimsDecoder for OpaqueTokenDecoder {
    fn decode(&self, token: &str) -> Result<SessionClaims> {
        if token.trim().is_empty() {
            return Err(GuardError::InvalidToken("empty token".to_string()));
        }
        Ok(SessionClaims {
            subject_id: None,
            expires_at: expiry_after(Utc::now(), self.lifetime),
        })
    }
}

// == Session ==
/// A verified caller, inserted into request extensions by `require_session`.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    pub subject_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, claims: SessionClaims) -> Self {
        Self {
            token: token.into(),
            subject_id: claims.subject_id,
            expires_at: claims.expires_at,
        }
    }

    /// The raw bearer token. Never log this.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Time left until the token expires on its own, zero if already past.
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("subject_id", &self.subject_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
