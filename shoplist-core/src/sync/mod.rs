//! Collection synchronization: reconciliation, subscription lifecycle and
//! the display surfaces that consume the result.

mod controller;
mod entity;
mod error;
mod reconcile;
mod surface;

pub use controller::{
    ControllerState, Delivery, Feed, HandleId, SnapshotSink, SubscriptionController, Update,
};
pub use entity::Entity;
pub use error::SyncError;
pub use reconcile::{
    apply_ops, reconcile, reconcile_with, CollectionSynchronizer, DuplicatePolicy, Operation,
    Reconciliation,
};
pub use surface::{DisplaySurface, MirrorSurface};
