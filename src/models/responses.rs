//! Response DTOs for the guard service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoints (GET /cache/stats[/:category])
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Category name, absent for the aggregate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Entries currently held
    pub keys: usize,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of swept entries
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(category: Option<&str>, stats: CacheStats) -> Self {
        Self {
            category: category.map(str::to_string),
            keys: stats.keys,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    #[serde(flatten)]
    pub total: StatsResponse,
    pub categories: Vec<StatsResponse>,
}

/// Response body for the flush endpoints (DELETE /cache[/:category])
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Entries removed
    pub removed: usize,
}

impl FlushResponse {
    pub fn new(category: Option<&str>, removed: usize) -> Self {
        Self {
            category: category.map(str::to_string),
            removed,
        }
    }
}

/// Response body for POST /revocations and POST /auth/logout
#[derive(Debug, Clone, Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
    pub reason: String,
    /// How long the revocation is kept, in seconds
    pub ttl_seconds: u64,
}

impl RevokeResponse {
    pub fn new(reason: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            revoked: true,
            reason: reason.into(),
            ttl_seconds,
        }
    }
}

/// Response body for POST /revocations/subjects/:subject_id
#[derive(Debug, Clone, Serialize)]
pub struct RevokeSubjectResponse {
    pub subject_id: String,
    pub reason: String,
    /// Durable rows re-stamped
    pub revoked: u64,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Revocations currently mirrored in memory
    pub revocations: usize,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(revocations: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            revocations,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
