//! Request and Response models for the guard service API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{RevokeRequest, RevokeSubjectRequest};
pub use responses::{
    CacheReport, ErrorResponse, FlushResponse, HealthResponse, RevokeResponse,
    RevokeSubjectResponse, StatsResponse,
};
