//! Session verification.
//!
//! `require_session` extracts the bearer token, rejects it if revoked, decodes
//! it through a `ClaimsDecoder`, and hands the resulting `Session` to the
//! handler.

mod session;
mod verifier;

pub use session::{bearer_token, ClaimsDecoder, OpaqueTokenDecoder, Session, SessionClaims};
pub use verifier::{require_session, SessionVerifier};
