//! Infrastructure layer: account storage, outbox, delivery relay, config.

pub mod config;
pub mod outbox;
pub mod store;

pub use config::{ConfigError, LedgerConfig};
pub use outbox::{
    LogMailer, MailError, Mailer, NotificationOutbox, OutboxError, OutboxRelay, OutboxStats,
    RelayConfig, RelayHandle, RelayReport,
};
pub use store::{
    AccountStore, AtomicUnit, IdempotencyKey, IdempotencyRecord, InMemoryAccountStore, LockKey,
    LockManager, StoreError,
};
