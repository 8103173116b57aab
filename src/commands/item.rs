//! Commands for the items of one list.

use clap::{Args, Subcommand};
use shoplist_core::{Item, ItemChanges, ItemFeed, LocalStore, NewItem, DEFAULT_CATEGORY};

use super::{first_rows, OutputFormat};
use crate::session::Session;

#[derive(Args)]
pub struct ItemCommand {
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// Add an item to a list
    Add {
        /// List ID
        list: String,

        /// Item name
        name: String,

        /// Quantity
        #[arg(long, short, default_value_t = 1)]
        qty: u32,

        /// Unit (e.g., "kg", "packs")
        #[arg(long, short, default_value = "pcs")]
        unit: String,

        /// Category the item is grouped under
        #[arg(long, default_value = DEFAULT_CATEGORY)]
        category: String,
    },

    /// Change fields of an item
    Edit {
        /// List ID
        list: String,

        /// Item ID
        id: String,

        #[arg(long, short)]
        name: Option<String>,

        #[arg(long, short)]
        qty: Option<u32>,

        #[arg(long, short)]
        unit: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Mark an item as purchased
    Check {
        /// List ID
        list: String,

        /// Item ID
        id: String,
    },

    /// Mark an item as not purchased
    Uncheck {
        /// List ID
        list: String,

        /// Item ID
        id: String,
    },

    /// Remove an item
    Delete {
        /// List ID
        list: String,

        /// Item ID
        id: String,
    },

    /// Show the items of a list
    Show {
        /// List ID
        list: String,

        /// Only items whose name starts with this text
        #[arg(long, short)]
        search: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

impl ItemSubcommand {
    fn list_id(&self) -> &str {
        match self {
            ItemSubcommand::Add { list, .. }
            | ItemSubcommand::Edit { list, .. }
            | ItemSubcommand::Check { list, .. }
            | ItemSubcommand::Uncheck { list, .. }
            | ItemSubcommand::Delete { list, .. }
            | ItemSubcommand::Show { list, .. } => list,
        }
    }
}

impl ItemCommand {
    pub async fn run(
        &self,
        store: &LocalStore,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut feed = ItemFeed::new(store.clone(), session.clone(), self.command.list_id());
        let list = feed.list()?;

        match &self.command {
            ItemSubcommand::Add {
                name,
                qty,
                unit,
                category,
                ..
            } => {
                let item = NewItem::new(name.as_str(), unit.as_str())
                    .with_quantity(*qty)
                    .with_category(category.as_str());
                let id = feed.add(item)?;
                println!("Added '{}' to '{}' ({})", name.trim(), list.title, id);
            }
            ItemSubcommand::Edit {
                id,
                name,
                qty,
                unit,
                category,
                ..
            } => {
                let changes = ItemChanges {
                    name: name.clone(),
                    quantity: *qty,
                    unit: unit.clone(),
                    category: category.clone(),
                    purchased: None,
                };
                if changes.is_empty() {
                    println!("Nothing to change");
                    return Ok(());
                }
                let item = feed.edit(id, &changes)?;
                println!("Updated {}", item);
            }
            ItemSubcommand::Check { id, .. } => {
                feed.set_purchased(id, true)?;
                println!("Checked {}", id);
            }
            ItemSubcommand::Uncheck { id, .. } => {
                feed.set_purchased(id, false)?;
                println!("Unchecked {}", id);
            }
            ItemSubcommand::Delete { id, .. } => {
                feed.delete(id)?;
                println!("Removed {} from '{}'", id, list.title);
            }
            ItemSubcommand::Show { search, format, .. } => {
                match search {
                    Some(text) => feed.search(text)?,
                    None => feed.open()?,
                }
                let items = first_rows(feed.next_update().await)?;
                feed.close();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Table => print_items(&list.title, &items),
                }
            }
        }

        Ok(())
    }
}

fn print_items(title: &str, items: &[Item]) {
    println!("{}", title);
    println!("{}", "=".repeat(60));

    if items.is_empty() {
        println!("No items.");
        return;
    }

    let mut category: Option<&str> = None;
    for item in items {
        if category != Some(item.category.as_str()) {
            category = Some(item.category.as_str());
            println!("\n{}:", item.category);
        }
        println!("  {}  {}", item, item.id);
    }

    let purchased = items.iter().filter(|i| i.purchased).count();
    println!("{}", "-".repeat(60));
    println!("{} of {} items purchased", purchased, items.len());
}
