//! Error types for the guard service
//!
//! Provides unified error handling using thiserror. Cache problems never show
//! up here: the cache degrades to a miss instead of failing.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Failures of the durable revocation backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Preparing the database location failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database rejected a statement
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The backend refused or could not serve the request
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

// == Guard Error Enum ==
/// Unified HTTP-facing error type.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// No bearer token on a protected route
    #[error("Missing bearer token")]
    MissingCredentials,

    /// The bearer token was revoked
    #[error("Token has been revoked")]
    TokenRevoked,

    /// The bearer token could not be decoded or is expired
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The durable revocation store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    fn status(&self) -> StatusCode {
        match self {
            GuardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GuardError::NotFound(_) => StatusCode::NOT_FOUND,
            GuardError::MissingCredentials
            | GuardError::TokenRevoked
            | GuardError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            GuardError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            GuardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse::new(self.to_string()));

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Result type for backend operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
