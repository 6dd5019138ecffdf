//! Entity trait: records with an identity and a stored revision.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing revision of the stored record.
    ///
    /// Used as the optimistic concurrency token when the record is written back.
    fn version(&self) -> u64;
}
