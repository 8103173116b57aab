//! Shopping list commands.

use clap::{Args, Subcommand};
use shoplist_core::{ListFeed, LocalStore, ShoppingList};

use super::{first_rows, OutputFormat};
use crate::session::Session;

#[derive(Args)]
pub struct ListCommand {
    #[command(subcommand)]
    pub command: ListSubcommand,
}

#[derive(Subcommand)]
pub enum ListSubcommand {
    /// Create a new list
    Add {
        /// List title
        title: String,
    },

    /// Rename a list
    Rename {
        /// List ID
        id: String,

        /// New title
        title: String,
    },

    /// Delete a list and all of its items
    Delete {
        /// List ID
        id: String,
    },

    /// Show your lists
    Show {
        /// Only lists whose title starts with this text
        #[arg(long, short)]
        search: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

impl ListCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut feed = ListFeed::new(store.clone(), session.clone());

        match &self.command {
            ListSubcommand::Add { title } => {
                let id = feed.create(title)?;
                println!("Created list '{}' ({})", title.trim(), id);
            }
            ListSubcommand::Rename { id, title } => {
                feed.rename(id, title)?;
                println!("Renamed list {} to '{}'", id, title.trim());
            }
            ListSubcommand::Delete { id } => {
                let list = feed.owned(id)?;
                feed.delete(id)?;
                println!("Deleted list '{}'", list.title);
            }
            ListSubcommand::Show { search, format } => {
                match search {
                    Some(text) => feed.search(text)?,
                    None => feed.open()?,
                }
                let lists = first_rows(feed.next_update().await)?;
                feed.close();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&lists)?);
                    }
                    OutputFormat::Table => print_lists(&lists),
                }
            }
        }

        Ok(())
    }
}

fn print_lists(lists: &[ShoppingList]) {
    if lists.is_empty() {
        println!("No lists found.");
        return;
    }

    println!("{:<36}  TITLE", "ID");
    println!("{}", "-".repeat(60));
    for list in lists {
        println!("{:<36}  {}", list.id, list);
    }
}
