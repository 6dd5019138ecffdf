//! Exclusive, bounded-wait locks keyed by account number or idempotency key.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use vaultline_accounts::AccountNumber;

use super::idempotency::IdempotencyKey;
use super::r#trait::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Account(AccountNumber),
    Idempotency(IdempotencyKey),
}

impl core::fmt::Display for LockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LockKey::Account(n) => write!(f, "account:{n}"),
            LockKey::Idempotency(k) => write!(f, "idempotency:{k}"),
        }
    }
}

/// Table of held keys. A key is held by at most one owner at a time; waiters
/// give up after their timeout instead of blocking forever.
///
/// Not re-entrant: owners track what they hold (see the in-memory unit).
#[derive(Debug, Default)]
pub struct LockManager {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, key: LockKey, timeout: Duration) -> Result<(), StoreError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut held = self.held.lock();

        while held.contains(&key) {
            if self.released.wait_until(&mut held, deadline).timed_out() && held.contains(&key) {
                return Err(StoreError::LockTimeout {
                    key: key.to_string(),
                    waited: started.elapsed(),
                });
            }
        }

        held.insert(key);
        Ok(())
    }

    pub fn release<'a>(&self, keys: impl IntoIterator<Item = &'a LockKey>) {
        let mut held = self.held.lock();
        let mut any = false;
        for key in keys {
            any |= held.remove(key);
        }
        drop(held);
        if any {
            self.released.notify_all();
        }
    }

    pub fn is_held(&self, key: &LockKey) -> bool {
        self.held.lock().contains(key)
    }
}
