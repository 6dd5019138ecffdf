//! Account storage boundary.
//!
//! `AccountStore` is the contract the ledger is written against: keyed reads plus
//! `run_atomic`, which hands the caller an `AtomicUnit` whose writes commit
//! together or not at all. Locks taken through the unit live exactly as long as
//! the unit.

pub mod idempotency;
pub mod in_memory;
pub mod locks;
pub mod r#trait;

pub use idempotency::{IdempotencyKey, IdempotencyRecord};
pub use in_memory::InMemoryAccountStore;
pub use locks::{LockKey, LockManager};
pub use r#trait::{AccountStore, AtomicUnit, StoreError};
