//! The contract a synchronized record has to fulfil.

use std::fmt::Debug;

/// A record that can be held in a [`CollectionSynchronizer`](super::CollectionSynchronizer).
///
/// Two entities are the same identity when their ids match, and unchanged
/// when additionally [`Entity::same_content`] holds.
pub trait Entity: Clone + Debug + Send + 'static {
    /// Narrowing predicate of a feed for this entity type
    /// (e.g. "lists owned by user U").
    type Scope: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Stable identity assigned by the store, unique within a collection.
    fn id(&self) -> &str;

    /// Compares the fields that matter for display.
    fn same_content(&self, other: &Self) -> bool;
}
