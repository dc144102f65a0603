//! Request DTOs for the guard service API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Longest accepted bearer token, in bytes.
pub const MAX_TOKEN_LEN: usize = 8192;

/// Longest accepted reason or subject id.
pub const MAX_LABEL_LEN: usize = 256;

/// Request body for POST /revocations
///
/// # Fields
/// - `token`: The raw token to revoke; only its hash is stored
/// - `subject_id`: Optional owner, enables bulk revocation later
/// - `reason`: Optional reason (defaults to `manual`)
/// - `ttl_seconds`: Optional revocation lifetime (defaults to the token lifetime)
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl RevokeRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.token.trim().is_empty() {
            return Some("Token cannot be empty".to_string());
        }
        if self.token.len() > MAX_TOKEN_LEN {
            return Some(format!(
                "Token exceeds maximum length of {MAX_TOKEN_LEN} bytes"
            ));
        }
        if let Some(subject_id) = &self.subject_id {
            if let Some(msg) = validate_label("Subject id", subject_id) {
                return Some(msg);
            }
        }
        if let Some(reason) = &self.reason {
            if let Some(msg) = validate_label("Reason", reason) {
                return Some(msg);
            }
        }
        if self.ttl_seconds == Some(0) {
            return Some("TTL must be greater than zero".to_string());
        }
        None
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("manual")
    }
}

/// Request body for POST /revocations/subjects/:subject_id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevokeSubjectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl RevokeSubjectRequest {
    pub fn validate(&self) -> Option<String> {
        self.reason
            .as_deref()
            .and_then(|reason| validate_label("Reason", reason))
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("bulk-revocation")
    }
}

/// Shared check for short free-text fields.
pub fn validate_label(field: &str, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(format!("{field} cannot be empty"));
    }
    if value.len() > MAX_LABEL_LEN {
        return Some(format!(
            "{field} exceeds maximum length of {MAX_LABEL_LEN} characters"
        ));
    }
    None
}
