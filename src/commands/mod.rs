mod config_cmd;
mod item;
mod list;
mod session_cmd;
mod watch;

use clap::ValueEnum;
use shoplist_core::{DocumentStorage, LocalStore, MirrorSurface, StoreError, SyncError, Update};

use crate::config::Config;

pub use config_cmd::ConfigCommand;
pub use item::ItemCommand;
pub use list::ListCommand;
pub use session_cmd::{login, logout, whoami};
pub use watch::WatchCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Opens the shopping document in the configured data directory.
pub fn open_store(config: &Config) -> Result<LocalStore, StoreError> {
    LocalStore::open(DocumentStorage::new(config.data_dir.value.clone()))
}

/// Turns the first update of a freshly opened feed into rows.
pub fn first_rows<T: Clone>(update: Option<Update<T>>) -> Result<Vec<T>, SyncError> {
    let mut surface: MirrorSurface<T> = MirrorSurface::new();
    match update {
        Some(Update::Failed(e)) => Err(e),
        Some(update) => {
            update.deliver_to(&mut surface);
            Ok(surface.rows().to_vec())
        }
        None => Ok(Vec::new()),
    }
}
