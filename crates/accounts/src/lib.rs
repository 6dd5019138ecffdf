//! Accounts module (customer account records and their numbering policy).
//!
//! Pure domain logic only: no IO, no locking, no persistence concerns. Snapshots
//! are immutable; every balance or status change returns a new `Account`.

pub mod account;
pub mod number;
pub mod request;

pub use account::{Account, AccountInfo, AccountStatus, ContactInfo, OwnerName, OwnerProfile};
pub use number::{
    AccountNumber, AccountNumberPolicy, NumberSource, RandomNumberSource, ScriptedNumberSource,
    SUFFIX_MAX, SUFFIX_MIN,
};
pub use request::{IdentityKey, OpenAccount};
