use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod session;

use commands::{open_store, ConfigCommand, ItemCommand, ListCommand, WatchCommand};
use config::Config;
use session::Session;

#[derive(Parser)]
#[command(name = "shoplist")]
#[command(version)]
#[command(about = "Shopping lists with live updates", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as a user on this machine
    Login {
        /// User name
        user: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage shopping lists
    List(ListCommand),

    /// Manage the items of a list
    Item(ItemCommand),

    /// Follow changes live
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoplist=warn,shoplist_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Login { user }) => commands::login(&config, &user)?,
        Some(Commands::Logout) => commands::logout(&config)?,
        Some(Commands::Whoami) => commands::whoami(&config)?,
        Some(Commands::List(cmd)) => {
            let store = open_store(&config)?;
            let session = Session::load(&config.data_dir.value)?;
            cmd.run(&store, &session).await?;
        }
        Some(Commands::Item(cmd)) => {
            let store = open_store(&config)?;
            let session = Session::load(&config.data_dir.value)?;
            cmd.run(&store, &session).await?;
        }
        Some(Commands::Watch(cmd)) => {
            let store = open_store(&config)?;
            let session = Session::load(&config.data_dir.value)?;
            cmd.run(&store, &session, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_item_add() {
        let cli = Cli::try_parse_from([
            "shoplist", "item", "add", "list-1", "Milk", "--qty", "2", "--unit", "l",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Item(_))));
    }
}
