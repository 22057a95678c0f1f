//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every ledger record with a stable identity (warehouses, reservations,
/// batches, alerts, shipment plans) implements this so generic record stores
/// can key them without knowing their shape.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
