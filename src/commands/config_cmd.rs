use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;
use crate::session::Session;

#[derive(Clone, ValueEnum, Default)]
pub enum ConfigFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: ConfigFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    ConfigFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    ConfigFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!(
                            "  session: {}",
                            Session::path(&config.data_dir.value).display()
                        );
                        println!();

                        println!("poll_interval_ms: {}", config.poll_interval_ms.value);
                        println!("  source: {}", config.poll_interval_ms.source);
                    }
                }
                Ok(())
            }
        }
    }
}
