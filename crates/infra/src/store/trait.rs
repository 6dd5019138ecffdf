use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use vaultline_accounts::{Account, AccountNumber, IdentityKey};
use vaultline_notifications::NotificationIntent;

use super::idempotency::{IdempotencyKey, IdempotencyRecord};

/// Account store operation error.
///
/// These are **infrastructure errors** (locking, uniqueness, concurrency) as opposed
/// to ledger rule failures, which the ledger decides on its own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A lock could not be acquired within the configured wait. Retryable.
    #[error("timed out after {waited:?} waiting for lock on {key}")]
    LockTimeout { key: String, waited: Duration },

    /// A unique constraint (account number or identity) or a version check failed
    /// at write time. Retryable.
    #[error("conflict: {0}")]
    Conflict(String),

    /// `update` was called for an account the unit never locked with `get_for_update`.
    #[error("account {0} was not locked in this atomic unit")]
    NotLocked(AccountNumber),

    /// `update` was called for an account that does not exist.
    #[error("account {0} does not exist")]
    Missing(AccountNumber),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. } | StoreError::Conflict(_))
    }
}

/// Keyed account storage with atomic read-modify-write.
///
/// ## Atomic units
///
/// `run_atomic(f)` runs `f` against a fresh unit:
/// - every write made through the unit becomes visible only when `f` returns `Ok`
///   and the commit succeeds
/// - if `f` returns `Err`, or the commit fails, nothing is applied
/// - locks acquired by the unit are released after commit or rollback, never earlier
///
/// Reads outside a unit (`get`, `exists_*`) see committed state only.
pub trait AccountStore: Send + Sync {
    type Unit: AtomicUnit;

    /// Committed snapshot of an account, if it exists.
    fn get(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError>;

    fn exists_by_account_number(&self, number: &AccountNumber) -> Result<bool, StoreError>;

    fn exists_by_identity(&self, identity: &IdentityKey) -> Result<bool, StoreError>;

    /// Execute `f` as one all-or-nothing unit.
    ///
    /// Commit failures are converted into `E` through `From<StoreError>`.
    fn run_atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Unit) -> Result<T, E>,
        E: From<StoreError>;
}

/// Operations available inside an atomic unit.
pub trait AtomicUnit {
    /// Lock the account (bounded wait) and return its current snapshot.
    ///
    /// The lock is taken even when the account does not exist, so a caller that
    /// locks several accounts in a fixed order keeps that order regardless of
    /// which ones are missing.
    fn get_for_update(&mut self, number: &AccountNumber) -> Result<Option<Account>, StoreError>;

    /// Stage a new account. Fails with `Conflict` if its number or identity is taken.
    fn insert(&mut self, account: Account) -> Result<Account, StoreError>;

    /// Stage a new snapshot of an account locked by this unit.
    ///
    /// The snapshot's version must equal the version it was read at.
    fn update(&mut self, account: Account) -> Result<Account, StoreError>;

    /// Stage an outbox record; it commits iff the unit commits.
    fn enqueue(&mut self, intent: NotificationIntent) -> Result<(), StoreError>;

    /// Lock an idempotency key for the rest of the unit and return the committed
    /// record for it, if any.
    fn claim_idempotency_key(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError>;

    /// Stage the outcome of an operation under its (claimed) key.
    fn record_outcome(&mut self, record: IdempotencyRecord) -> Result<(), StoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore,
{
    type Unit = S::Unit;

    fn get(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        (**self).get(number)
    }

    fn exists_by_account_number(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        (**self).exists_by_account_number(number)
    }

    fn exists_by_identity(&self, identity: &IdentityKey) -> Result<bool, StoreError> {
        (**self).exists_by_identity(identity)
    }

    fn run_atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Unit) -> Result<T, E>,
        E: From<StoreError>,
    {
        (**self).run_atomic(f)
    }
}
