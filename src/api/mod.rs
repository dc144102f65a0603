//! API Module
//!
//! HTTP handlers and routing for the guard service operations API.
//!
//! # Public listener
//! - `GET /health` - Health check endpoint
//! - `POST /auth/logout` - Revoke the presented token
//!
//! # Admin listener (loopback only)
//! - `GET /health` - Health check endpoint
//! - `GET /cache/stats[/:category]` - Cache statistics
//! - `DELETE /cache[/:category]` - Cache flushes
//! - `POST /revocations` - Revoke a token
//! - `POST /revocations/subjects/:subject_id` - Revoke all tokens of a subject

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_admin_router, create_router};
