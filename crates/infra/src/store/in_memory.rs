use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use vaultline_accounts::{Account, AccountNumber, IdentityKey};
use vaultline_core::{Clock, Entity, ExpectedVersion, NotificationId, SystemClock};
use vaultline_notifications::NotificationIntent;

use crate::config::LedgerConfig;

use super::idempotency::{IdempotencyKey, IdempotencyRecord};
use super::locks::{LockKey, LockManager};
use super::r#trait::{AccountStore, AtomicUnit, StoreError};

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) accounts: HashMap<AccountNumber, Account>,
    pub(crate) identities: HashMap<IdentityKey, AccountNumber>,
    /// Insertion order is delivery order.
    pub(crate) outbox: Vec<NotificationIntent>,
    pub(crate) outbox_index: HashMap<NotificationId, usize>,
    pub(crate) idempotency: HashMap<IdempotencyKey, IdempotencyRecord>,
}

pub(crate) struct Shared {
    pub(crate) tables: RwLock<Tables>,
    pub(crate) locks: LockManager,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) lock_timeout: Duration,
}

/// In-memory account store with exclusive per-account locks.
///
/// Intended for tests/dev and single-process deployments. Cloning is cheap and
/// clones share state. Also serves as the notification outbox, since outbox
/// records must commit in the same unit as account writes.
#[derive(Clone)]
pub struct InMemoryAccountStore {
    pub(crate) shared: Arc<Shared>,
}

impl core::fmt::Debug for InMemoryAccountStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let tables = self.shared.tables.read();
        f.debug_struct("InMemoryAccountStore")
            .field("accounts", &tables.accounts.len())
            .field("outbox", &tables.outbox.len())
            .field("lock_timeout", &self.shared.lock_timeout)
            .finish()
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), LedgerConfig::default().lock_timeout())
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::with_parts(Arc::new(SystemClock), config.lock_timeout())
    }

    pub fn with_parts(clock: Arc<dyn Clock>, lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                locks: LockManager::new(),
                clock,
                lock_timeout,
            }),
        }
    }

    /// Committed snapshots of every account, ordered by account number.
    pub fn accounts(&self) -> Vec<Account> {
        let tables = self.shared.tables.read();
        let mut all: Vec<_> = tables.accounts.values().cloned().collect();
        all.sort_by(|a, b| a.account_number().cmp(b.account_number()));
        all
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    type Unit = InMemoryUnit;

    fn get(&self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        Ok(self.shared.tables.read().accounts.get(number).cloned())
    }

    fn exists_by_account_number(&self, number: &AccountNumber) -> Result<bool, StoreError> {
        Ok(self.shared.tables.read().accounts.contains_key(number))
    }

    fn exists_by_identity(&self, identity: &IdentityKey) -> Result<bool, StoreError> {
        Ok(self.shared.tables.read().identities.contains_key(identity))
    }

    fn run_atomic<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Unit) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut unit = InMemoryUnit::new(self.shared.clone());
        // On error the unit is dropped: staged writes vanish, locks are released.
        let value = f(&mut unit)?;
        unit.commit()?;
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert,
    Update { base_version: u64 },
}

#[derive(Debug, Clone)]
struct StagedWrite {
    account: Account,
    kind: WriteKind,
}

/// One atomic unit against [`InMemoryAccountStore`].
///
/// Writes are staged locally and applied under the table write lock at commit,
/// after every insert and version check has been validated.
pub struct InMemoryUnit {
    shared: Arc<Shared>,
    held: Vec<LockKey>,
    held_set: HashSet<LockKey>,
    /// Versions observed by `get_for_update`, the optimistic token for `update`.
    read_versions: HashMap<AccountNumber, u64>,
    writes: HashMap<AccountNumber, StagedWrite>,
    write_order: Vec<AccountNumber>,
    outbox: Vec<NotificationIntent>,
    outcomes: Vec<IdempotencyRecord>,
}

impl InMemoryUnit {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            held: Vec::new(),
            held_set: HashSet::new(),
            read_versions: HashMap::new(),
            writes: HashMap::new(),
            write_order: Vec::new(),
            outbox: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    fn lock(&mut self, key: LockKey) -> Result<(), StoreError> {
        if self.held_set.contains(&key) {
            return Ok(());
        }
        self.shared.locks.acquire(key.clone(), self.shared.lock_timeout)?;
        self.held_set.insert(key.clone());
        self.held.push(key);
        Ok(())
    }

    fn current(&self, number: &AccountNumber) -> Option<Account> {
        if let Some(staged) = self.writes.get(number) {
            return Some(staged.account.clone());
        }
        self.shared.tables.read().accounts.get(number).cloned()
    }

    fn stage(&mut self, account: Account, kind: WriteKind) {
        let number = account.account_number().clone();
        if !self.writes.contains_key(&number) {
            self.write_order.push(number.clone());
        }
        self.writes.insert(number, StagedWrite { account, kind });
    }

    fn commit(mut self) -> Result<(), StoreError> {
        if self.writes.is_empty() && self.outbox.is_empty() && self.outcomes.is_empty() {
            return Ok(());
        }

        let mut tables = self.shared.tables.write();

        // Validate everything before touching anything.
        for number in &self.write_order {
            let staged = &self.writes[number];
            match staged.kind {
                WriteKind::Insert => {
                    if tables.accounts.contains_key(number) {
                        return Err(StoreError::Conflict(format!(
                            "account number {number} is already taken"
                        )));
                    }
                    let identity = staged.account.identity();
                    if tables.identities.contains_key(identity) {
                        return Err(StoreError::Conflict(format!(
                            "identity {identity} is already registered"
                        )));
                    }
                }
                WriteKind::Update { base_version } => {
                    let committed = tables
                        .accounts
                        .get(number)
                        .ok_or_else(|| StoreError::Missing(number.clone()))?;
                    ExpectedVersion(base_version)
                        .check(committed.version())
                        .map_err(|e| StoreError::Conflict(e.to_string()))?;
                }
            }
        }
        for record in &self.outcomes {
            if tables.idempotency.contains_key(&record.key) {
                return Err(StoreError::Conflict(format!(
                    "idempotency key {} was recorded concurrently",
                    record.key
                )));
            }
        }

        for number in std::mem::take(&mut self.write_order) {
            if let Some(staged) = self.writes.remove(&number) {
                if staged.kind == WriteKind::Insert {
                    tables
                        .identities
                        .insert(staged.account.identity().clone(), number.clone());
                }
                tables.accounts.insert(number, staged.account);
            }
        }
        for intent in std::mem::take(&mut self.outbox) {
            let position = tables.outbox.len();
            tables.outbox_index.insert(intent.id, position);
            tables.outbox.push(intent);
        }
        for record in std::mem::take(&mut self.outcomes) {
            tables.idempotency.insert(record.key.clone(), record);
        }

        debug!(locks = self.held.len(), "atomic unit committed");
        Ok(())
    }
}

impl Drop for InMemoryUnit {
    fn drop(&mut self) {
        self.shared.locks.release(self.held.iter());
    }
}

impl AtomicUnit for InMemoryUnit {
    fn get_for_update(&mut self, number: &AccountNumber) -> Result<Option<Account>, StoreError> {
        self.lock(LockKey::Account(number.clone()))?;
        let current = self.current(number);
        if let Some(account) = &current {
            self.read_versions
                .entry(number.clone())
                .or_insert(account.version());
        }
        Ok(current)
    }

    fn insert(&mut self, account: Account) -> Result<Account, StoreError> {
        let number = account.account_number().clone();
        {
            let tables = self.shared.tables.read();
            if tables.accounts.contains_key(&number) {
                return Err(StoreError::Conflict(format!(
                    "account number {number} is already taken"
                )));
            }
            if tables.identities.contains_key(account.identity()) {
                return Err(StoreError::Conflict(format!(
                    "identity {} is already registered",
                    account.identity()
                )));
            }
        }
        let staged_clash = self.writes.values().any(|w| {
            w.account.account_number() == &number || w.account.identity() == account.identity()
        });
        if staged_clash {
            return Err(StoreError::Conflict(format!(
                "account {number} clashes with a write in this unit"
            )));
        }

        let stored = account.into_inserted(self.shared.clock.now());
        self.stage(stored.clone(), WriteKind::Insert);
        Ok(stored)
    }

    fn update(&mut self, account: Account) -> Result<Account, StoreError> {
        let number = account.account_number().clone();
        if !self.held_set.contains(&LockKey::Account(number.clone())) {
            return Err(StoreError::NotLocked(number));
        }

        let current = self
            .current(&number)
            .ok_or_else(|| StoreError::Missing(number.clone()))?;
        ExpectedVersion(current.version())
            .check(account.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        let kind = match self.writes.get(&number).map(|w| w.kind) {
            Some(WriteKind::Insert) => WriteKind::Insert,
            _ => WriteKind::Update {
                base_version: self
                    .read_versions
                    .get(&number)
                    .copied()
                    .unwrap_or(current.version()),
            },
        };

        let stored = account.into_updated(self.shared.clock.now());
        self.stage(stored.clone(), kind);
        Ok(stored)
    }

    fn enqueue(&mut self, intent: NotificationIntent) -> Result<(), StoreError> {
        self.outbox.push(intent);
        Ok(())
    }

    fn claim_idempotency_key(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        self.lock(LockKey::Idempotency(key.clone()))?;
        Ok(self.shared.tables.read().idempotency.get(key).cloned())
    }

    fn record_outcome(&mut self, record: IdempotencyRecord) -> Result<(), StoreError> {
        if !self
            .held_set
            .contains(&LockKey::Idempotency(record.key.clone()))
        {
            return Err(StoreError::Storage(format!(
                "idempotency key {} was not claimed in this unit",
                record.key
            )));
        }
        self.outcomes.retain(|r| r.key != record.key);
        self.outcomes.push(record);
        Ok(())
    }
}
