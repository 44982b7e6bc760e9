mod client;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::client::{ApiClient, DEFAULT_TIMEOUT_SECS};
use crate::commands::SettingsCommands;

#[derive(Debug, Parser)]
#[command(name = "msrp-cli")]
#[command(about = "List price service command line interface")]
struct Cli {
    /// Base URL of the running server
    #[arg(long, env = "MSRP_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,
    /// Bearer key for admin and editor endpoints
    #[arg(long, env = "MSRP_API_KEY")]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read or update plugin settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Check server and database health
    Health,
    /// Load a catalog fixture straight into the database
    Seed {
        /// Path to the catalog YAML file
        #[arg(long, default_value = "./config/catalog.yaml")]
        catalog: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Settings { command } => {
            let client = ApiClient::new(&cli.base_url, cli.api_key, DEFAULT_TIMEOUT_SECS)?;
            match command {
                SettingsCommands::Get => commands::run_settings_get(&client).await,
                SettingsCommands::Set {
                    label,
                    custom_css,
                    custom_css_file,
                } => commands::run_settings_set(&client, label, custom_css, custom_css_file).await,
            }
        }
        Commands::Health => {
            let client = ApiClient::new(&cli.base_url, None, DEFAULT_TIMEOUT_SECS)?;
            commands::run_health(&client).await
        }
        Commands::Seed { catalog } => commands::run_seed(&catalog).await,
    }
}
