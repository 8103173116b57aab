//! A document store kept in one Automerge document.
//!
//! Every committed change re-evaluates all live listeners and pushes the
//! full snapshot of their scope. With a [`DocumentStorage`] attached, each
//! mutation first merges whatever other processes saved, then saves the
//! result, so several processes can share one data directory.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use automerge::AutoCommit;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::reader::{read_item_by_id, read_items, read_list_by_id, read_lists};
use super::storage::DocumentStorage;
use super::writer;
use super::{DocumentStore, ShoppingStore, StoreError, Subscription};
use crate::models::{matches_prefix, Item, ListScope, NewItem, Queryable, ShoppingList, UserScope};
use crate::sync::{Entity, SnapshotSink};

/// Shared handle to the shopping document. Cheap to clone.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
}

struct State {
    doc: AutoCommit,
    storage: Option<DocumentStorage>,
    lists: Vec<Listener<ShoppingList>>,
    items: Vec<Listener<Item>>,
    next_listener: u64,
}

struct Listener<T: Entity> {
    id: u64,
    scope: T::Scope,
    sink: SnapshotSink<T>,
}

impl LocalStore {
    /// A store that lives only as long as this process.
    ///
    /// The top-level maps are created by the first write; with no other
    /// writer around there is nothing for them to conflict with.
    pub fn in_memory() -> Self {
        Self::from_parts(AutoCommit::new(), None)
    }

    /// Opens the document in `storage`, creating and saving it when absent.
    pub fn open(storage: DocumentStorage) -> Result<Self, StoreError> {
        let doc = match storage.load()? {
            Some(doc) => {
                debug!(path = %storage.path().display(), "Loaded shopping document");
                doc
            }
            None => {
                let mut doc = AutoCommit::new();
                writer::init_document(&mut doc)?;
                storage.save(&mut doc)?;
                info!(path = %storage.path().display(), "Created shopping document");
                doc
            }
        };
        Ok(Self::from_parts(doc, Some(storage)))
    }

    fn from_parts(doc: AutoCommit, storage: Option<DocumentStorage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    doc,
                    storage,
                    lists: Vec::new(),
                    items: Vec::new(),
                    next_listener: 0,
                }),
            }),
        }
    }

    /// Merges changes saved by other processes and notifies listeners when
    /// anything arrived. Returns whether the document changed.
    pub fn refresh(&self) -> Result<bool, StoreError> {
        let mut state = self.inner.lock();
        let changed = state.merge_from_disk()?;
        if changed {
            debug!("Document changed on disk");
            state.notify_all();
        }
        Ok(changed)
    }

    /// Number of live realtime listeners.
    pub fn listener_count(&self) -> usize {
        let state = self.inner.lock();
        state.lists.len() + state.items.len()
    }

    /// Runs `change` against a draft of the document, persists the draft
    /// and only then adopts it and notifies every listener.
    ///
    /// When the change or the save fails the document is left as it was,
    /// apart from whatever was merged in from disk.
    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut AutoCommit) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut state = self.inner.lock();
        let merged = state.merge_from_disk()?;

        let mut draft = state.doc.clone();
        let outcome = change(&mut draft).and_then(|result| {
            draft.commit();
            if let Some(storage) = &state.storage {
                storage.save(&mut draft)?;
            }
            Ok(result)
        });

        match outcome {
            Ok(result) => {
                state.doc = draft;
                state.notify_all();
                Ok(result)
            }
            Err(e) => {
                if merged {
                    state.notify_all();
                }
                Err(e)
            }
        }
    }

    fn subscription(&self, id: u64) -> Box<dyn Subscription> {
        Box::new(LocalSubscription {
            inner: Arc::downgrade(&self.inner),
            id,
            active: true,
        })
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn merge_from_disk(&mut self) -> Result<bool, StoreError> {
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        let Some(mut theirs) = storage.load()? else {
            return Ok(false);
        };
        let before = self.doc.get_heads();
        self.doc.merge(&mut theirs)?;
        Ok(self.doc.get_heads() != before)
    }

    fn next_id(&mut self) -> u64 {
        self.next_listener += 1;
        self.next_listener
    }

    fn notify_all(&mut self) {
        let doc = &self.doc;
        self.lists.retain(|l| deliver(l, snapshot_lists(doc, &l.scope)));
        self.items.retain(|l| deliver(l, snapshot_items(doc, &l.scope)));
    }

    fn remove_listener(&mut self, id: u64) -> bool {
        let before = self.lists.len() + self.items.len();
        self.lists.retain(|l| l.id != id);
        self.items.retain(|l| l.id != id);
        before != self.lists.len() + self.items.len()
    }
}

/// Sends one snapshot. Returns false when the listener is gone for good.
fn deliver<T: Entity>(listener: &Listener<T>, snapshot: Result<Vec<T>, StoreError>) -> bool {
    let delivered = match snapshot {
        Ok(entities) => listener.sink.snapshot(entities),
        Err(e) => {
            warn!(listener = listener.id, error = %e, "Failed to read snapshot");
            listener.sink.error(e)
        }
    };
    if !delivered {
        debug!(listener = listener.id, "Dropping listener with closed sink");
    }
    delivered
}

fn snapshot_lists(doc: &AutoCommit, scope: &UserScope) -> Result<Vec<ShoppingList>, StoreError> {
    let mut lists: Vec<ShoppingList> = read_lists(doc)?
        .into_iter()
        .filter(|l| l.in_scope(scope))
        .collect();
    lists.sort_by(|a, b| a.listen_cmp(b));
    Ok(lists)
}

fn snapshot_items(doc: &AutoCommit, scope: &ListScope) -> Result<Vec<Item>, StoreError> {
    let mut items = read_items(doc, scope.list_id())?;
    items.sort_by(|a, b| a.listen_cmp(b));
    Ok(items)
}

fn search<T: Queryable>(members: Vec<T>, prefix: &str) -> Vec<T> {
    let mut found: Vec<T> = members
        .into_iter()
        .filter(|m| matches_prefix(m.search_key(), prefix))
        .collect();
    found.sort_by(|a, b| a.search_cmp(b));
    found
}

impl DocumentStore<ShoppingList> for LocalStore {
    fn listen(
        &self,
        scope: &UserScope,
        sink: SnapshotSink<ShoppingList>,
    ) -> Result<Box<dyn Subscription>, StoreError> {
        let mut state = self.inner.lock();
        let snapshot = snapshot_lists(&state.doc, scope)?;

        let id = state.next_id();
        sink.snapshot(snapshot);
        state.lists.push(Listener {
            id,
            scope: scope.clone(),
            sink,
        });
        debug!(listener = id, user = scope.user_id(), "List listener added");
        Ok(self.subscription(id))
    }

    fn query_once(
        &self,
        scope: &UserScope,
        prefix: &str,
    ) -> BoxFuture<'static, Result<Vec<ShoppingList>, StoreError>> {
        let state = self.inner.lock();
        let result = snapshot_lists(&state.doc, scope).map(|lists| search(lists, prefix));
        future::ready(result).boxed()
    }
}

impl DocumentStore<Item> for LocalStore {
    fn listen(
        &self,
        scope: &ListScope,
        sink: SnapshotSink<Item>,
    ) -> Result<Box<dyn Subscription>, StoreError> {
        let mut state = self.inner.lock();
        let snapshot = snapshot_items(&state.doc, scope)?;

        let id = state.next_id();
        sink.snapshot(snapshot);
        state.items.push(Listener {
            id,
            scope: scope.clone(),
            sink,
        });
        debug!(listener = id, list = scope.list_id(), "Item listener added");
        Ok(self.subscription(id))
    }

    fn query_once(
        &self,
        scope: &ListScope,
        prefix: &str,
    ) -> BoxFuture<'static, Result<Vec<Item>, StoreError>> {
        let state = self.inner.lock();
        let result = read_items(&state.doc, scope.list_id()).map(|items| search(items, prefix));
        future::ready(result).boxed()
    }
}

impl ShoppingStore for LocalStore {
    fn create_list(&self, user_id: &str, title: &str) -> Result<String, StoreError> {
        let list = ShoppingList::new(Uuid::new_v4().to_string(), user_id, title);
        self.mutate(|doc| writer::write_list(doc, &list))?;
        info!(id = %list.id, "Created list");
        Ok(list.id)
    }

    fn rename_list(&self, list_id: &str, title: &str) -> Result<(), StoreError> {
        self.mutate(|doc| {
            let mut list = read_list_by_id(doc, list_id)?
                .ok_or_else(|| StoreError::NotFound(format!("list {}", list_id)))?;
            list.title = title.to_string();
            writer::write_list(doc, &list)
        })
    }

    fn delete_list(&self, list_id: &str) -> Result<(), StoreError> {
        self.mutate(|doc| {
            if read_list_by_id(doc, list_id)?.is_none() {
                return Err(StoreError::NotFound(format!("list {}", list_id)));
            }
            writer::delete_list(doc, list_id)
        })?;
        info!(id = list_id, "Deleted list");
        Ok(())
    }

    fn get_list(&self, list_id: &str) -> Result<ShoppingList, StoreError> {
        let state = self.inner.lock();
        read_list_by_id(&state.doc, list_id)?
            .ok_or_else(|| StoreError::NotFound(format!("list {}", list_id)))
    }

    fn create_item(&self, list_id: &str, item: NewItem) -> Result<String, StoreError> {
        let item = item.into_item(Uuid::new_v4().to_string(), list_id);
        self.mutate(|doc| {
            if read_list_by_id(doc, list_id)?.is_none() {
                return Err(StoreError::NotFound(format!("list {}", list_id)));
            }
            writer::write_item(doc, &item)
        })?;
        debug!(id = %item.id, list = list_id, "Created item");
        Ok(item.id)
    }

    fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        self.mutate(|doc| {
            if read_item_by_id(doc, &item.list_id, &item.id)?.is_none() {
                return Err(StoreError::NotFound(format!("item {}", item.id)));
            }
            writer::write_item(doc, item)
        })
    }

    fn set_purchased(
        &self,
        list_id: &str,
        item_id: &str,
        purchased: bool,
    ) -> Result<(), StoreError> {
        self.mutate(|doc| {
            let mut item = read_item_by_id(doc, list_id, item_id)?
                .ok_or_else(|| StoreError::NotFound(format!("item {}", item_id)))?;
            item.purchased = purchased;
            writer::write_item(doc, &item)
        })
    }

    fn delete_item(&self, list_id: &str, item_id: &str) -> Result<(), StoreError> {
        self.mutate(|doc| {
            if read_item_by_id(doc, list_id, item_id)?.is_none() {
                return Err(StoreError::NotFound(format!("item {}", item_id)));
            }
            writer::delete_item(doc, list_id, item_id)
        })
    }

    fn get_item(&self, list_id: &str, item_id: &str) -> Result<Item, StoreError> {
        let state = self.inner.lock();
        read_item_by_id(&state.doc, list_id, item_id)?
            .ok_or_else(|| StoreError::NotFound(format!("item {}", item_id)))
    }
}

struct LocalSubscription {
    inner: Weak<Inner>,
    id: u64,
    active: bool,
}

impl Subscription for LocalSubscription {
    fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.inner.upgrade() {
            if inner.lock().remove_listener(self.id) {
                debug!(listener = self.id, "Listener removed");
            }
        }
    }
}

impl Drop for LocalSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
