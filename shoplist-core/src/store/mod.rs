//! Collaborators the synchronization core depends on: the signed-in user,
//! the document store and its subscriptions.
//!
//! [`LocalStore`] implements every store trait on top of one Automerge
//! document, optionally persisted to disk.

mod local;
mod reader;
mod storage;
mod writer;

use automerge::AutomergeError;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::models::{Item, NewItem, ShoppingList};
use crate::sync::{Entity, SnapshotSink};

pub use local::LocalStore;
pub use storage::{DocumentStorage, StorageError, DATA_FILENAME};

/// Errors reported by a document store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed list or item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reading or writing the document failed.
    #[error("Automerge error: {0}")]
    Automerge(String),

    /// Loading or saving the document file failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A feed could not be served.
    #[error("Listener failed: {0}")]
    Listener(String),
}

impl From<AutomergeError> for StoreError {
    fn from(e: AutomergeError) -> Self {
        StoreError::Automerge(e.to_string())
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::Storage(e.to_string())
    }
}

/// Source of the current user's identity.
pub trait AuthProvider: Send + Sync {
    /// Id of the signed-in user, if any.
    fn current_user_id(&self) -> Option<String>;
}

/// A fixed identity, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth(pub Option<String>);

impl StaticAuth {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }
}

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A live realtime feed. Dropping it unsubscribes.
pub trait Subscription: Send {
    /// Stops the feed. Calling it again does nothing.
    fn unsubscribe(&mut self);
}

/// Read side of a document store for one entity type.
pub trait DocumentStore<T: Entity> {
    /// Opens a realtime feed for `scope`.
    ///
    /// The current snapshot is delivered to `sink` right away and again
    /// after every change until the returned subscription is dropped.
    fn listen(
        &self,
        scope: &T::Scope,
        sink: SnapshotSink<T>,
    ) -> Result<Box<dyn Subscription>, StoreError>;

    /// Fetches the members of `scope` whose search field falls within
    /// `[prefix, prefix + U+F8FF]`, in search order.
    fn query_once(
        &self,
        scope: &T::Scope,
        prefix: &str,
    ) -> BoxFuture<'static, Result<Vec<T>, StoreError>>;
}

/// Write side of the shopping list store.
pub trait ShoppingStore {
    /// Creates a list and returns its new id.
    fn create_list(&self, user_id: &str, title: &str) -> Result<String, StoreError>;

    fn rename_list(&self, list_id: &str, title: &str) -> Result<(), StoreError>;

    /// Deletes a list together with all of its items.
    fn delete_list(&self, list_id: &str) -> Result<(), StoreError>;

    fn get_list(&self, list_id: &str) -> Result<ShoppingList, StoreError>;

    /// Adds an item to an existing list and returns its new id.
    fn create_item(&self, list_id: &str, item: NewItem) -> Result<String, StoreError>;

    /// Replaces the stored content of an existing item.
    fn update_item(&self, item: &Item) -> Result<(), StoreError>;

    fn set_purchased(&self, list_id: &str, item_id: &str, purchased: bool)
        -> Result<(), StoreError>;

    fn delete_item(&self, list_id: &str, item_id: &str) -> Result<(), StoreError>;

    fn get_item(&self, list_id: &str, item_id: &str) -> Result<Item, StoreError>;
}

impl<A: AuthProvider + ?Sized> AuthProvider for std::sync::Arc<A> {
    fn current_user_id(&self) -> Option<String> {
        (**self).current_user_id()
    }
}
