//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; two value objects with the same values are
//! the same value. `Money`, `Amount`, account numbers and owner names are all value
//! objects, while an `Account` is an entity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one, build a
/// new one (e.g. `Money::checked_add` returns a new balance).
///
/// ```ignore
/// use rust_decimal_macros::dec;
///
/// let a = Money::try_from_decimal(dec!(100)).unwrap();
/// let b = Money::try_from_decimal(dec!(100.00)).unwrap();
/// assert_eq!(a, b); // equal by value, scale is normalized
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
