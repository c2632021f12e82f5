//! Entity trait: things compared by identity rather than by value.

/// An object with a stable identity across state changes.
///
/// Two entities with the same id are the same thing even if their attributes
/// differ (an invoice line for job X is *the* line for job X, whatever its
/// price).
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
