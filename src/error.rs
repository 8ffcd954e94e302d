use crate::session::SessionState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported signature scheme: {0}")]
    UnsupportedScheme(String),
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
    #[error("nonce mismatch: session expects {expected}, token carries {found}")]
    NonceMismatch { expected: String, found: String },
    #[error("{operation} requires state {required}, session is in {actual}")]
    Precondition {
        operation: &'static str,
        required: SessionState,
        actual: SessionState,
    },
    #[error("salt storage failure")]
    Storage(#[from] sqlx::Error),
    #[error("epoch fetch failed: {0}")]
    EpochFetch(String),
    #[error("signing failed: {0}")]
    Signing(String),
}
