//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every record mirrored from the stock backend is an entity keyed by the
/// backend's integer id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Remote collection the entity lives in (e.g. `stock.quant`).
    const COLLECTION: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
