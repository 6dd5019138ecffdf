//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic rule failure raised by value objects and account snapshots.
///
/// Carries no locking or storage detail; the ledger maps these onto its own
/// taxonomy (`InvalidRequest`, `InvalidAmount`, `Conflict`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input: a blank name, an email without `@`, an amount with too many decimals.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The change would break an account rule (overdraft, illegal status move).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier or account number failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Stale snapshot: the stored version moved on since it was read.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
