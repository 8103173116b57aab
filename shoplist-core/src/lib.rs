//! Shoplist Core Library
//!
//! Shopping list models, the collection synchronizer that turns store
//! snapshots into display operations, and the realtime subscription
//! controller that feeds it.

pub mod feed;
pub mod models;
pub mod store;
pub mod sync;

pub use feed::{ItemFeed, ListFeed};
pub use models::{
    clean_title, matches_prefix, Item, ItemChanges, ListScope, NewItem, Queryable, ShoppingList,
    UserScope, DEFAULT_CATEGORY,
};
pub use store::{
    AuthProvider, DocumentStorage, DocumentStore, LocalStore, ShoppingStore, StaticAuth,
    StorageError, StoreError, Subscription,
};
pub use sync::{
    apply_ops, reconcile, reconcile_with, CollectionSynchronizer, ControllerState, DisplaySurface,
    DuplicatePolicy, Entity, HandleId, MirrorSurface, Operation, SnapshotSink,
    SubscriptionController, SyncError, Update,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
