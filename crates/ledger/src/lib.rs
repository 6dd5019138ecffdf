//! `vaultline-ledger`: balance mutation and invariant enforcement.
//!
//! The ledger composes the store contract from `vaultline-infra` with the
//! account rules from `vaultline-accounts`. It owns no IO of its own.

pub mod error;
pub mod ledger;
pub mod request;
pub mod response;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerResult};
pub use request::{CreditDebit, Transfer};
pub use response::LedgerResponse;
