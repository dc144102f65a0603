//! Revoked token record and token hashing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded token hash.
pub const TOKEN_HASH_LEN: usize = 64;

/// Hashes a bearer token for storage and lookup.
///
/// Only this digest is ever persisted or logged; the raw token is not.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Short prefix of a hash, for log fields.
pub fn hash_prefix(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}

/// `now + ttl`, saturating at the maximum representable instant.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Revoked Token ==
/// One row of the durable revocation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedToken {
    /// SHA-256 of the bearer token, hex encoded
    pub token_hash: String,
    /// Owner of the token, when known
    pub subject_id: Option<String>,
    /// Why the token was revoked (`logout`, `bulk-revocation`, ...)
    pub reason: String,
    pub revoked_at: DateTime<Utc>,
    /// Expiry of the revoked token itself; the row may be purged afterwards
    pub expires_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Builds a record for a raw token revoked at `now` for `ttl`.
    pub fn new(
        token: &str,
        subject_id: Option<String>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            token_hash: token_hash(token),
            subject_id,
            reason: reason.into(),
            revoked_at: now,
            expires_at: expiry_after(now, ttl),
        }
    }

    /// Whether the row is still needed at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Applies a repeated revocation of the same token to this row.
    ///
    /// `revoked_at` and `reason` take the newer values, the subject is kept
    /// when the newer call does not name one, and the later expiry wins.
    pub fn merge_from(&mut self, newer: &RevokedToken) {
        self.revoked_at = newer.revoked_at;
        self.reason = newer.reason.clone();
        if newer.subject_id.is_some() {
            self.subject_id = newer.subject_id.clone();
        }
        self.expires_at = self.expires_at.max(newer.expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_fixed_length_hex() {
        let hash = token_hash("tok123");
        assert_eq!(hash.len(), TOKEN_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!hash.contains("tok123"));
    }

    #[test]
    fn test_token_hash_is_stable() {
        assert_eq!(token_hash("a"), token_hash("a"));
        assert_ne!(token_hash("a"), token_hash("b"));
        assert_eq!(
            token_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_record_expiry_follows_ttl() {
        let now = Utc::now();
        let record = RevokedToken::new(
            "tok123",
            Some("u1".into()),
            "logout",
            now,
            Duration::from_secs(4 * 3600),
        );

        assert_eq!(record.expires_at - now, chrono::Duration::hours(4));
        assert!(record.is_active_at(now));
        assert!(!record.is_active_at(record.expires_at));
    }

    #[test]
    fn test_expiry_saturates() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_merge_from() {
        let now = Utc::now();
        let mut row = RevokedToken::new("t", Some("u1".into()), "logout", now, Duration::from_secs(60));
        let later = now + chrono::Duration::seconds(5);
        let newer = RevokedToken::new("t", None, "manual", later, Duration::from_secs(10));

        row.merge_from(&newer);

        assert_eq!(row.reason, "manual");
        assert_eq!(row.revoked_at, later);
        assert_eq!(row.subject_id.as_deref(), Some("u1"));
        assert_eq!(row.expires_at, now + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_hash_prefix() {
        assert_eq!(hash_prefix("abcdef0123456789"), "abcdef012345");
        assert_eq!(hash_prefix("abc"), "abc");
    }
}
