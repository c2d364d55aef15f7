//! Cookie-to-identity admission protocol.
//!
//! Every variant of [`AuthError`] is a diagnostic. Callers outside this module
//! only ever surface a generic unauthorized response.

pub mod cookie;
pub mod session;
pub mod signature;

pub use cookie::SessionCookieValue;
pub use session::{Identity, SessionResolver, UserId};
pub use signature::SignatureVerifier;

/// Why a connection attempt was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("session cookie missing")]
    MissingCookie,
    #[error("session cookie malformed")]
    MalformedCookie,
    #[error("session cookie signature mismatch")]
    BadSignature,
    #[error("session not found")]
    NotFound,
    #[error("session record corrupt")]
    CorruptSession,
    #[error("session store timed out")]
    StoreTimeout,
    #[error("session store unavailable")]
    StoreUnavailable,
}
