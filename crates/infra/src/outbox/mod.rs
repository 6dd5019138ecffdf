//! Notification outbox: durable intents plus the relay that delivers them.
//!
//! ## Design
//!
//! - Intents are written only through an `AtomicUnit`, so they exist iff the
//!   ledger mutation that produced them committed
//! - `NotificationOutbox` is the consumer side: drain pending intents, then
//!   report each delivery as sent or failed
//! - Delivery is at-least-once; a crash between send and `mark_sent` resends
//! - A failed delivery never touches account state

pub mod relay;
pub mod store;

pub use relay::{LogMailer, MailError, Mailer, OutboxRelay, RelayConfig, RelayHandle, RelayReport};
pub use store::{NotificationOutbox, OutboxError, OutboxStats};
