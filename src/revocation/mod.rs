//! Revocation Module
//!
//! Tracks revoked bearer tokens by hash in a durable table mirrored in memory.
//!
//! # Consistency
//! - Revocations made on this process are visible to the next lookup.
//! - Revocations written by other processes become visible after the next
//!   sync, or immediately once the mirror is older than the staleness
//!   threshold (a lookup miss then queries the table).
//! - A table query that errors or times out during a lookup rejects the token.

mod backend;
mod mirror;
mod record;
mod sqlite_backend;
mod store;

pub use backend::{MemoryBackend, RevocationBackend};
pub use mirror::RevocationMirror;
pub use record::{expiry_after, hash_prefix, token_hash, RevokedToken, TOKEN_HASH_LEN};
pub use sqlite_backend::SqliteBackend;
pub use store::{RevocationConfig, RevocationStore};
