//! Subscription lifecycle for one display scope.
//!
//! A [`SubscriptionController`] holds at most one live feed (a realtime
//! listener or a one-shot query) and routes what it delivers into a
//! [`CollectionSynchronizer`].
//!
//! Stores deliver from whatever thread they like through a [`SnapshotSink`].
//! Deliveries are queued on a channel and only touch the collection when the
//! owner drains them with [`SubscriptionController::next_update`] or
//! [`SubscriptionController::try_next_update`], so all mutation happens on
//! the owner's context. A one-shot query is held by the controller and
//! polled from the same two methods. Every feed gets a fresh [`HandleId`];
//! deliveries tagged with any other id are dropped.

use std::fmt;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::entity::Entity;
use super::error::SyncError;
use super::reconcile::{CollectionSynchronizer, DuplicatePolicy, Operation};
use crate::store::{DocumentStore, StoreError, Subscription};

/// Identity of one feed (realtime listener or one-shot query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a delivery.
#[derive(Debug)]
pub enum Feed<T> {
    /// Full member set of the scope, in the scope's order.
    Snapshot(Vec<T>),
    /// The store reported a failure for this feed.
    Failed(StoreError),
}

impl<T> From<Result<Vec<T>, StoreError>> for Feed<T> {
    fn from(result: Result<Vec<T>, StoreError>) -> Self {
        match result {
            Ok(entities) => Feed::Snapshot(entities),
            Err(error) => Feed::Failed(error),
        }
    }
}

/// A payload tagged with the feed that produced it.
#[derive(Debug)]
pub struct Delivery<T> {
    pub handle: HandleId,
    pub feed: Feed<T>,
}

/// Write end handed to a store for one feed. Usable from any thread.
#[derive(Debug)]
pub struct SnapshotSink<T> {
    handle: HandleId,
    tx: mpsc::UnboundedSender<Delivery<T>>,
}

impl<T> Clone for SnapshotSink<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            tx: self.tx.clone(),
        }
    }
}

impl<T> SnapshotSink<T> {
    /// Delivers a full snapshot. Returns false once the controller is gone.
    pub fn snapshot(&self, entities: Vec<T>) -> bool {
        self.send(Feed::Snapshot(entities))
    }

    /// Delivers a failure. Returns false once the controller is gone.
    pub fn error(&self, error: StoreError) -> bool {
        self.send(Feed::Failed(error))
    }

    /// True when nothing will ever read from this sink again.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, feed: Feed<T>) -> bool {
        self.tx
            .send(Delivery {
                handle: self.handle,
                feed,
            })
            .is_ok()
    }
}

/// Lifecycle state of a controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState<S> {
    /// No feed.
    Idle,
    /// A realtime listener is live for the scope.
    Listening(S),
    /// A one-shot prefix query was issued for the scope.
    OneShot { scope: S, prefix: String },
}

/// What the owner has to show after a delivery was routed.
#[derive(Debug)]
pub enum Update<T> {
    /// Operations to apply to the display, in order. May be empty.
    Changed(Vec<Operation<T>>),
    /// A failure to surface once. The feed stays as it is.
    Failed(SyncError),
}

type Query<T> = BoxFuture<'static, Result<Vec<T>, StoreError>>;

/// What woke [`SubscriptionController::next_update`].
enum Wake<T> {
    Queued(Option<Delivery<T>>),
    Resolved(HandleId, Result<Vec<T>, StoreError>),
}

/// Owns the feed and the synchronized collection of one display scope.
///
/// All methods are expected to run on one context. No runtime is needed to
/// issue a search; its result is picked up by the next drain.
pub struct SubscriptionController<T: Entity, D> {
    store: D,
    synchronizer: CollectionSynchronizer<T>,
    state: ControllerState<T::Scope>,
    subscription: Option<Box<dyn Subscription>>,
    pending: Option<(HandleId, Query<T>)>,
    current: Option<HandleId>,
    next_handle: u64,
    tx: mpsc::UnboundedSender<Delivery<T>>,
    rx: mpsc::UnboundedReceiver<Delivery<T>>,
}

impl<T, D> SubscriptionController<T, D>
where
    T: Entity,
    D: DocumentStore<T>,
{
    pub fn new(store: D) -> Self {
        Self::with_policy(store, DuplicatePolicy::default())
    }

    pub fn with_policy(store: D, policy: DuplicatePolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            synchronizer: CollectionSynchronizer::with_policy(policy),
            state: ControllerState::Idle,
            subscription: None,
            pending: None,
            current: None,
            next_handle: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &ControllerState<T::Scope> {
        &self.state
    }

    /// The collection as last reconciled.
    pub fn items(&self) -> &[T] {
        self.synchronizer.items()
    }

    /// Number of realtime listeners currently held (0 or 1).
    pub fn live_handles(&self) -> usize {
        usize::from(self.subscription.is_some())
    }

    /// Id of the feed whose deliveries are currently accepted.
    pub fn current_handle(&self) -> Option<HandleId> {
        self.current
    }

    /// Opens a realtime listener for `scope`.
    ///
    /// A no-op when already listening to the same scope. Any other feed is
    /// torn down first.
    pub fn start_listening(&mut self, scope: T::Scope) -> Result<(), SyncError> {
        if let ControllerState::Listening(current) = &self.state {
            if *current == scope {
                debug!(?scope, "Already listening, keeping current handle");
                return Ok(());
            }
        }
        self.teardown();

        let handle = self.issue_handle();
        let sink = SnapshotSink {
            handle,
            tx: self.tx.clone(),
        };
        let subscription = self.store.listen(&scope, sink)?;

        info!(?scope, %handle, "Listening");
        self.subscription = Some(subscription);
        self.current = Some(handle);
        self.state = ControllerState::Listening(scope);
        Ok(())
    }

    /// Unsubscribes the realtime listener, if any.
    ///
    /// Snapshots still in flight from it are dropped when they arrive.
    pub fn stop_listening(&mut self) {
        if !matches!(self.state, ControllerState::Listening(_)) {
            return;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(handle) = self.current.take() {
            info!(%handle, "Stopped listening");
        }
        self.state = ControllerState::Idle;
    }

    /// Replaces the realtime feed with a one-shot prefix query.
    ///
    /// A prefix that is empty after trimming restores listening instead.
    pub fn search(&mut self, scope: T::Scope, prefix: &str) -> Result<(), SyncError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return self.clear_search(scope);
        }
        self.teardown();

        let handle = self.issue_handle();
        let query = self.store.query_once(&scope, prefix);

        debug!(?scope, prefix, %handle, "Issuing one-shot query");
        self.pending = Some((handle, query));
        self.current = Some(handle);
        self.state = ControllerState::OneShot {
            scope,
            prefix: prefix.to_string(),
        };
        Ok(())
    }

    /// Drops the filter and goes back to listening to `scope`.
    pub fn clear_search(&mut self, scope: T::Scope) -> Result<(), SyncError> {
        self.start_listening(scope)
    }

    /// Drops whatever feed is active. Safe to call at any time.
    pub fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.pending = None;
        if let Some(handle) = self.current.take() {
            debug!(%handle, "Feed torn down");
        }
        self.state = ControllerState::Idle;
    }

    /// Routes one delivery.
    ///
    /// Returns `None` when the delivery came from a feed that is no longer
    /// current.
    pub fn dispatch(&mut self, delivery: Delivery<T>) -> Option<Update<T>> {
        if self.current != Some(delivery.handle) {
            debug!(handle = %delivery.handle, "Ignoring delivery from stale handle");
            return None;
        }

        // A one-shot query resolves exactly once.
        if matches!(self.state, ControllerState::OneShot { .. }) {
            self.current = None;
        }

        match delivery.feed {
            Feed::Snapshot(entities) => {
                debug!(handle = %delivery.handle, count = entities.len(), "Snapshot received");
                match self.synchronizer.reconcile(entities) {
                    Ok(ops) => Some(Update::Changed(ops)),
                    Err(error) => Some(Update::Failed(error)),
                }
            }
            Feed::Failed(error) => {
                warn!(handle = %delivery.handle, %error, "Feed reported a failure");
                Some(Update::Failed(SyncError::Backend(error)))
            }
        }
    }

    /// Waits for the next delivery from the current feed and routes it.
    ///
    /// Stale deliveries are skipped. Pends forever while no feed delivers.
    pub async fn next_update(&mut self) -> Option<Update<T>> {
        loop {
            let wake = match &mut self.pending {
                Some((handle, query)) => {
                    let handle = *handle;
                    tokio::select! {
                        received = self.rx.recv() => Wake::Queued(received),
                        result = query => Wake::Resolved(handle, result),
                    }
                }
                None => Wake::Queued(self.rx.recv().await),
            };
            let delivery = match wake {
                Wake::Queued(received) => received?,
                Wake::Resolved(handle, result) => {
                    self.pending = None;
                    Delivery {
                        handle,
                        feed: result.into(),
                    }
                }
            };
            if let Some(update) = self.dispatch(delivery) {
                return Some(update);
            }
        }
    }

    /// Routes the next queued delivery, or a finished one-shot result,
    /// without waiting.
    pub fn try_next_update(&mut self) -> Option<Update<T>> {
        while let Ok(delivery) = self.rx.try_recv() {
            if let Some(update) = self.dispatch(delivery) {
                return Some(update);
            }
        }
        let delivery = self.poll_query()?;
        self.dispatch(delivery)
    }

    fn poll_query(&mut self) -> Option<Delivery<T>> {
        let (handle, query) = self.pending.as_mut()?;
        let result = query.as_mut().now_or_never()?;
        let handle = *handle;
        self.pending = None;
        Some(Delivery {
            handle,
            feed: result.into(),
        })
    }

    fn issue_handle(&mut self) -> HandleId {
        self.next_handle += 1;
        HandleId(self.next_handle)
    }
}

impl<T: Entity, D> Drop for SubscriptionController<T, D> {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
