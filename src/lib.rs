//! Thesis Guard - token revocation and response caching for the thesis workflow API
//!
//! Provides a multi-category TTL cache with read-through and invalidation
//! middleware, and a revocation store that keeps a durable table and an
//! in-memory mirror in sync.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod revocation;
pub mod service;
pub mod tasks;

pub use api::{create_admin_router, create_router, AppState};
pub use config::Config;
pub use error::{GuardError, StorageError};
pub use service::GuardService;
