//! Ledger failure taxonomy.

use std::time::Duration;

use thiserror::Error;

use vaultline_accounts::{AccountInfo, AccountStatus};
use vaultline_core::{Amount, DomainError};
use vaultline_infra::StoreError;

/// Every way a ledger operation can fail.
///
/// Failures are values: each carries what a caller needs to render a precise
/// message, and none of them leave a partially applied mutation behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("an account is already registered for {identity}")]
    IdentityAlreadyRegistered { identity: String },

    #[error("account {account_number} does not exist")]
    AccountNotFound { account_number: String },

    #[error("source account {account_number} does not exist")]
    SourceAccountNotFound { account_number: String },

    #[error("destination account {account_number} does not exist")]
    DestinationAccountNotFound { account_number: String },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("cannot transfer from account {account_number} to itself")]
    SameAccount { account_number: String },

    #[error(
        "insufficient funds: account {} holds {}, requested {requested}",
        account.account_number,
        account.balance
    )]
    InsufficientFunds {
        account: AccountInfo,
        requested: Amount,
    },

    #[error("no free account number after {attempts} attempts")]
    AccountNumberExhausted { attempts: u32 },

    #[error("timed out after {waited:?} waiting for {resource}")]
    LockTimeout { resource: String, waited: Duration },

    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("account {} is {status}", account.account_number)]
    AccountNotActive {
        account: AccountInfo,
        status: AccountStatus,
    },

    #[error("idempotency key {key} was already used for a different request")]
    IdempotencyKeyReused { key: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage failure: {0}")]
    Store(String),
}

impl LedgerError {
    /// Response code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::IdentityAlreadyRegistered { .. } => "001",
            LedgerError::AccountNotFound { .. }
            | LedgerError::SourceAccountNotFound { .. }
            | LedgerError::DestinationAccountNotFound { .. } => "003",
            LedgerError::InsufficientFunds { .. } => "006",
            LedgerError::InvalidAmount { .. } => "009",
            LedgerError::SameAccount { .. } => "010",
            LedgerError::AccountNumberExhausted { .. } => "011",
            LedgerError::LockTimeout { .. } => "012",
            LedgerError::Conflict(_) => "013",
            LedgerError::AccountNotActive { .. } => "014",
            LedgerError::IdempotencyKeyReused { .. } => "015",
            LedgerError::InvalidRequest(_) => "016",
            LedgerError::Store(_) => "099",
        }
    }

    /// Caller-facing message. The historical codes keep their fixed texts; the
    /// rest describe the failure in full.
    pub fn message(&self) -> String {
        match self {
            LedgerError::IdentityAlreadyRegistered { .. } => {
                "This user already has an account created".to_string()
            }
            LedgerError::AccountNotFound { .. } => "User provided account not exist!".to_string(),
            LedgerError::SourceAccountNotFound { .. } => {
                "Source account does not exist!".to_string()
            }
            LedgerError::DestinationAccountNotFound { .. } => {
                "Destination account does not exist!".to_string()
            }
            LedgerError::InsufficientFunds { .. } => "Insufficient account balance!".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the same request may succeed if simply tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::LockTimeout { .. } | LedgerError::Conflict(_)
        )
    }

    /// Partial account projection carried by the failure, if any.
    pub fn account(&self) -> Option<&AccountInfo> {
        match self {
            LedgerError::InsufficientFunds { account, .. }
            | LedgerError::AccountNotActive { account, .. } => Some(account),
            _ => None,
        }
    }

    pub(crate) fn invalid_amount(err: DomainError) -> Self {
        let reason = match err {
            DomainError::Validation(msg) | DomainError::InvariantViolation(msg) => msg,
            other => other.to_string(),
        };
        LedgerError::InvalidAmount { reason }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout { key, waited } => LedgerError::LockTimeout {
                resource: key,
                waited,
            },
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            other => LedgerError::Store(other.to_string()),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => LedgerError::InvalidRequest(msg),
            other @ DomainError::NotFound => LedgerError::InvalidRequest(other.to_string()),
        }
    }
}
