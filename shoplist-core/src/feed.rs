//! Feeds bind a subscription controller to the store and the signed-in
//! user, exposing what a screen needs: open, search, close and the edits
//! that flow back through the realtime feed.

use tracing::debug;

use crate::models::{clean_title, Item, ItemChanges, ListScope, NewItem, ShoppingList, UserScope};
use crate::store::{AuthProvider, DocumentStore, ShoppingStore, StoreError};
use crate::sync::{ControllerState, DuplicatePolicy, SubscriptionController, SyncError, Update};

/// The signed-in user's shopping lists.
pub struct ListFeed<S, A>
where
    S: DocumentStore<ShoppingList> + ShoppingStore + Clone,
    A: AuthProvider,
{
    store: S,
    auth: A,
    controller: SubscriptionController<ShoppingList, S>,
}

impl<S, A> ListFeed<S, A>
where
    S: DocumentStore<ShoppingList> + ShoppingStore + Clone,
    A: AuthProvider,
{
    pub fn new(store: S, auth: A) -> Self {
        Self::with_policy(store, auth, DuplicatePolicy::default())
    }

    pub fn with_policy(store: S, auth: A, policy: DuplicatePolicy) -> Self {
        let controller = SubscriptionController::with_policy(store.clone(), policy);
        Self {
            store,
            auth,
            controller,
        }
    }

    fn user_id(&self) -> Result<String, SyncError> {
        current_user(&self.auth)
    }

    /// Starts the realtime feed of the current user's lists.
    pub fn open(&mut self) -> Result<(), SyncError> {
        let scope = UserScope::new(self.user_id()?);
        self.controller.start_listening(scope)
    }

    /// Shows only lists whose title starts with `text`. Blank text shows
    /// everything again.
    pub fn search(&mut self, text: &str) -> Result<(), SyncError> {
        let scope = UserScope::new(self.user_id()?);
        self.controller.search(scope, text)
    }

    pub fn close(&mut self) {
        self.controller.teardown();
    }

    pub fn create(&self, title: &str) -> Result<String, SyncError> {
        let user_id = self.user_id()?;
        let title = clean_title(title)?;
        Ok(self.store.create_list(&user_id, &title)?)
    }

    pub fn rename(&self, list_id: &str, title: &str) -> Result<(), SyncError> {
        let title = clean_title(title)?;
        self.owned(list_id)?;
        Ok(self.store.rename_list(list_id, &title)?)
    }

    /// Deletes a list together with its items.
    pub fn delete(&self, list_id: &str) -> Result<(), SyncError> {
        self.owned(list_id)?;
        debug!(list = list_id, "Deleting list");
        Ok(self.store.delete_list(list_id)?)
    }

    /// Fetches a list of the current user. Other users' lists are not found.
    pub fn owned(&self, list_id: &str) -> Result<ShoppingList, SyncError> {
        owned_list(&self.store, &self.auth, list_id)
    }

    pub fn lists(&self) -> &[ShoppingList] {
        self.controller.items()
    }

    pub fn state(&self) -> &ControllerState<UserScope> {
        self.controller.state()
    }

    pub async fn next_update(&mut self) -> Option<Update<ShoppingList>> {
        self.controller.next_update().await
    }

    pub fn try_next_update(&mut self) -> Option<Update<ShoppingList>> {
        self.controller.try_next_update()
    }
}

/// The items of one list owned by the signed-in user.
///
/// Every operation first checks that the list exists and belongs to the
/// current user; a list of someone else reads as not found.
pub struct ItemFeed<S, A>
where
    S: DocumentStore<Item> + ShoppingStore + Clone,
    A: AuthProvider,
{
    store: S,
    auth: A,
    list_id: String,
    controller: SubscriptionController<Item, S>,
}

impl<S, A> ItemFeed<S, A>
where
    S: DocumentStore<Item> + ShoppingStore + Clone,
    A: AuthProvider,
{
    pub fn new(store: S, auth: A, list_id: impl Into<String>) -> Self {
        Self::with_policy(store, auth, list_id, DuplicatePolicy::default())
    }

    pub fn with_policy(
        store: S,
        auth: A,
        list_id: impl Into<String>,
        policy: DuplicatePolicy,
    ) -> Self {
        let controller = SubscriptionController::with_policy(store.clone(), policy);
        Self {
            store,
            auth,
            list_id: list_id.into(),
            controller,
        }
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    /// The list this feed shows.
    pub fn list(&self) -> Result<ShoppingList, SyncError> {
        owned_list(&self.store, &self.auth, &self.list_id)
    }

    fn scope(&self) -> Result<ListScope, SyncError> {
        self.list()?;
        Ok(ListScope::new(self.list_id.clone()))
    }

    pub fn open(&mut self) -> Result<(), SyncError> {
        let scope = self.scope()?;
        self.controller.start_listening(scope)
    }

    /// Shows only items whose name starts with `text`, ordered by name.
    pub fn search(&mut self, text: &str) -> Result<(), SyncError> {
        let scope = self.scope()?;
        self.controller.search(scope, text)
    }

    pub fn close(&mut self) {
        self.controller.teardown();
    }

    pub fn add(&self, item: NewItem) -> Result<String, SyncError> {
        let item = item.normalized()?;
        self.list()?;
        Ok(self.store.create_item(&self.list_id, item)?)
    }

    /// Applies `changes` to an item and returns the stored result.
    pub fn edit(&self, item_id: &str, changes: &ItemChanges) -> Result<Item, SyncError> {
        self.list()?;
        let current = self.store.get_item(&self.list_id, item_id)?;
        let updated = changes.apply(&current)?;
        if updated != current {
            self.store.update_item(&updated)?;
        }
        Ok(updated)
    }

    pub fn set_purchased(&self, item_id: &str, purchased: bool) -> Result<(), SyncError> {
        self.list()?;
        Ok(self
            .store
            .set_purchased(&self.list_id, item_id, purchased)?)
    }

    /// Flips the purchased flag and returns the new value.
    pub fn toggle(&self, item_id: &str) -> Result<bool, SyncError> {
        self.list()?;
        let item = self.store.get_item(&self.list_id, item_id)?;
        self.set_purchased(item_id, !item.purchased)?;
        Ok(!item.purchased)
    }

    pub fn delete(&self, item_id: &str) -> Result<(), SyncError> {
        self.list()?;
        Ok(self.store.delete_item(&self.list_id, item_id)?)
    }

    pub fn items(&self) -> &[Item] {
        self.controller.items()
    }

    pub fn state(&self) -> &ControllerState<ListScope> {
        self.controller.state()
    }

    pub async fn next_update(&mut self) -> Option<Update<Item>> {
        self.controller.next_update().await
    }

    pub fn try_next_update(&mut self) -> Option<Update<Item>> {
        self.controller.try_next_update()
    }
}

fn current_user<A: AuthProvider>(auth: &A) -> Result<String, SyncError> {
    auth.current_user_id().ok_or(SyncError::NotAuthenticated)
}

fn owned_list<S, A>(store: &S, auth: &A, list_id: &str) -> Result<ShoppingList, SyncError>
where
    S: ShoppingStore,
    A: AuthProvider,
{
    let user_id = current_user(auth)?;
    let list = store.get_list(list_id)?;
    if list.user_id != user_id {
        return Err(StoreError::NotFound(format!("list {}", list_id)).into());
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, StaticAuth};
    use crate::sync::{DisplaySurface, MirrorSurface};

    fn list_feed(user: Option<&str>) -> ListFeed<LocalStore, StaticAuth> {
        let auth = StaticAuth(user.map(str::to_string));
        ListFeed::with_policy(LocalStore::in_memory(), auth, DuplicatePolicy::Reject)
    }

    fn drain_lists(feed: &mut ListFeed<LocalStore, StaticAuth>, surface: &mut MirrorSurface<ShoppingList>) {
        while let Some(update) = feed.try_next_update() {
            update.deliver_to(surface);
        }
    }

    #[test]
    fn test_open_requires_user() {
        let mut feed = list_feed(None);
        assert!(matches!(feed.open(), Err(SyncError::NotAuthenticated)));
        assert!(matches!(feed.create("Groceries"), Err(SyncError::NotAuthenticated)));
        assert_eq!(feed.state(), &ControllerState::Idle);
    }

    #[test]
    fn test_create_validates_title() {
        let feed = list_feed(Some("alice"));
        assert!(matches!(feed.create("   "), Err(SyncError::Validation(_))));

        let id = feed.create("  Groceries  ").unwrap();
        assert_eq!(feed.owned(&id).unwrap().title, "Groceries");
    }

    #[test]
    fn test_lists_follow_edits() {
        let mut feed = list_feed(Some("alice"));
        let mut surface = MirrorSurface::new();
        feed.open().unwrap();

        let groceries = feed.create("Groceries").unwrap();
        let hardware = feed.create("Hardware").unwrap();
        feed.rename(&groceries, "Pharmacy").unwrap();
        feed.delete(&hardware).unwrap();
        drain_lists(&mut feed, &mut surface);

        let titles: Vec<&str> = surface.rows().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Pharmacy"]);
        assert_eq!(surface.rows(), feed.lists());
    }

    #[test]
    fn test_other_users_lists_are_not_found() {
        let store = LocalStore::in_memory();
        let theirs = store.create_list("bob", "Bob's list").unwrap();
        let feed = ListFeed::new(store, StaticAuth::signed_in("alice"));

        assert!(matches!(
            feed.delete(&theirs),
            Err(SyncError::Backend(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_search_then_clear() {
        let mut feed = list_feed(Some("alice"));
        let mut surface = MirrorSurface::new();
        for title in ["Groceries", "Gift ideas", "Hardware"] {
            feed.create(title).unwrap();
        }
        feed.open().unwrap();
        drain_lists(&mut feed, &mut surface);
        assert_eq!(surface.rows().len(), 3);

        feed.search(" Gr ").unwrap();
        feed.next_update().await.unwrap().deliver_to(&mut surface);
        let titles: Vec<&str> = surface.rows().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Groceries"]);

        feed.search("").unwrap();
        drain_lists(&mut feed, &mut surface);
        assert_eq!(surface.rows().len(), 3);
        assert_eq!(
            feed.state(),
            &ControllerState::Listening(UserScope::new("alice"))
        );
    }

    #[test]
    fn test_item_feed_edits() {
        let store = LocalStore::in_memory();
        let list = store.create_list("alice", "Groceries").unwrap();
        let auth = StaticAuth::signed_in("alice");
        let mut feed = ItemFeed::with_policy(store, auth, list, DuplicatePolicy::Reject);
        let mut surface = MirrorSurface::new();
        feed.open().unwrap();

        let milk = feed
            .add(NewItem::new(" Milk ", "l").with_category("Dairy"))
            .unwrap();
        assert!(feed.add(NewItem::new("Eggs", "dozen").with_quantity(0)).is_err());
        assert!(feed.toggle(&milk).unwrap());

        let edited = feed
            .edit(
                &milk,
                &ItemChanges {
                    quantity: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(edited.purchased);

        while let Some(update) = feed.try_next_update() {
            update.deliver_to(&mut surface);
        }
        assert_eq!(surface.rows(), &[edited]);

        feed.delete(&milk).unwrap();
        if let Some(Update::Changed(ops)) = feed.try_next_update() {
            surface.render(&ops);
        }
        assert!(surface.rows().is_empty());
    }

    #[test]
    fn test_item_feed_hides_other_users_lists() {
        let store = LocalStore::in_memory();
        let theirs = store.create_list("bob", "Bob's list").unwrap();
        let milk = store.create_item(&theirs, NewItem::new("Milk", "l")).unwrap();
        let mut feed = ItemFeed::new(store.clone(), StaticAuth::signed_in("alice"), theirs.clone());

        let not_found = |r: Result<_, SyncError>| {
            matches!(r, Err(SyncError::Backend(StoreError::NotFound(_))))
        };
        assert!(not_found(feed.open().map(|_| ())));
        assert!(not_found(feed.search("Mi").map(|_| ())));
        assert!(not_found(feed.add(NewItem::new("Eggs", "dozen")).map(|_| ())));
        assert!(not_found(feed.toggle(&milk).map(|_| ())));
        assert!(not_found(feed.delete(&milk).map(|_| ())));

        assert_eq!(feed.state(), &ControllerState::Idle);
        assert!(!store.get_item(&theirs, &milk).unwrap().purchased);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_item_feed_requires_user() {
        let store = LocalStore::in_memory();
        let list = store.create_list("alice", "Groceries").unwrap();
        let mut feed = ItemFeed::new(store, StaticAuth::default(), list);

        assert!(matches!(feed.open(), Err(SyncError::NotAuthenticated)));
    }
}
