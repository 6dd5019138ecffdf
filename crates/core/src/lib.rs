//! `vaultline-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;
pub mod version;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, NotificationId};
pub use money::{Amount, MONEY_SCALE, Money};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
