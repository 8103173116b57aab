//! Follows a realtime feed and prints every operation it emits.

use clap::Args;
use std::fmt::Display;
use std::time::Duration;

use shoplist_core::{
    DisplaySurface, Entity, ItemFeed, ListFeed, LocalStore, MirrorSurface, Operation, SyncError,
    Update,
};
use tracing::warn;

use crate::config::Config;
use crate::session::Session;

#[derive(Args)]
pub struct WatchCommand {
    /// Watch the items of this list instead of your lists
    #[arg(long, short)]
    pub list: Option<String>,
}

impl WatchCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        session: &Session,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let poll = Duration::from_millis(config.poll_interval_ms.value);

        match &self.list {
            Some(list_id) => {
                let mut feed = ItemFeed::new(store.clone(), session.clone(), list_id.as_str());
                let list = feed.list()?;
                feed.open()?;
                println!("Watching '{}' (Ctrl-C to stop)", list.title);
                watch(&mut feed, store, poll).await;
                feed.close();
            }
            None => {
                let mut lists = ListFeed::new(store.clone(), session.clone());
                lists.open()?;
                println!("Watching your lists (Ctrl-C to stop)");
                watch(&mut lists, store, poll).await;
                lists.close();
            }
        }

        Ok(())
    }
}

/// A feed `watch` can follow.
trait Watched {
    type Row: Entity + Display;

    async fn next_update(&mut self) -> Option<Update<Self::Row>>;
}

impl Watched for ListFeed<LocalStore, Session> {
    type Row = shoplist_core::ShoppingList;

    async fn next_update(&mut self) -> Option<Update<Self::Row>> {
        ListFeed::next_update(self).await
    }
}

impl Watched for ItemFeed<LocalStore, Session> {
    type Row = shoplist_core::Item;

    async fn next_update(&mut self) -> Option<Update<Self::Row>> {
        ItemFeed::next_update(self).await
    }
}

/// Prints updates until Ctrl-C, polling the data file for other writers.
async fn watch<W: Watched>(feed: &mut W, store: &LocalStore, poll: Duration) {
    let mut surface = ConsoleSurface::new();
    let mut tick = tokio::time::interval(poll);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            update = feed.next_update() => match update {
                Some(update) => update.deliver_to(&mut surface),
                None => break,
            },
            _ = tick.tick() => {
                if let Err(e) = store.refresh() {
                    warn!(error = %e, "Failed to reload data file");
                }
            }
            _ = &mut ctrl_c => break,
        }
    }
}

/// Prints operations as they are applied to a local replica.
struct ConsoleSurface<T> {
    mirror: MirrorSurface<T>,
}

impl<T: Entity + Display> ConsoleSurface<T> {
    fn new() -> Self {
        Self {
            mirror: MirrorSurface::new(),
        }
    }

    fn describe(&self, op: &Operation<T>) -> String {
        match op {
            Operation::Remove { index, id } => format!("- [{}] {}", index, id),
            Operation::Update { index, entity } => format!("~ [{}] {}", index, entity),
            Operation::Move { from, to, id } => format!("> [{} -> {}] {}", from, to, id),
            Operation::Insert { index, entity } => format!("+ [{}] {}", index, entity),
        }
    }
}

impl<T: Entity + Display> DisplaySurface<T> for ConsoleSurface<T> {
    fn render(&mut self, ops: &[Operation<T>]) {
        for op in ops {
            println!("{}", self.describe(op));
        }
        self.mirror.render(ops);
        if !ops.is_empty() {
            println!("({} shown)", self.mirror.rows().len());
        }
    }

    fn report(&mut self, error: &SyncError) {
        eprintln!("! {}", error);
    }
}
