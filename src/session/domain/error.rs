//! Error types for guest session construction.

use thiserror::Error;

/// Errors returned while constructing session domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionDomainError {
    /// The configured time-to-live is zero or negative.
    #[error("session time-to-live must be positive, got {0} seconds")]
    NonPositiveTtl(i64),

    /// The time-to-live does not fit in a duration.
    #[error("session time-to-live of {0} hours is out of range")]
    TtlOutOfRange(i64),

    /// The token string is not a valid UUID.
    #[error("invalid session token '{0}'")]
    InvalidToken(String),
}
