//! Notification intents (outbox records) and the messages the ledger emits.
//!
//! The ledger never sends anything; it records what should be sent. Delivery is
//! the business of whoever drains the outbox.

pub mod intent;
pub mod templates;

pub use intent::{NotificationIntent, NotificationStatus};
