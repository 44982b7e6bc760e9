//! Command handlers for the CLI.
//!
//! Settings and health go through the REST API of a running server; seeding
//! talks to the database directly so it works before the server is up.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use msrp_core::settings::SettingsPatch;

use crate::client::ApiClient;

/// Sub-commands available under `settings`.
#[derive(Debug, Subcommand)]
pub enum SettingsCommands {
    /// Show the current label and badge CSS
    Get,
    /// Update one or both settings; omitted flags keep stored values
    Set {
        /// New storefront label (empty clears it)
        #[arg(long)]
        label: Option<String>,
        /// New badge CSS declarations (empty clears them)
        #[arg(long, conflicts_with = "custom_css_file")]
        custom_css: Option<String>,
        /// Read the badge CSS declarations from a file
        #[arg(long)]
        custom_css_file: Option<PathBuf>,
    },
}

fn print_settings(settings: &msrp_core::settings::Settings) {
    println!("label:      {}", settings.label);
    if settings.custom_css.is_empty() {
        println!("custom_css: (none)");
    } else {
        println!("custom_css:");
        for line in settings.custom_css.lines() {
            println!("  {line}");
        }
    }
}

/// Show the current settings.
///
/// # Errors
///
/// Returns an error if the request fails or the caller lacks the admin
/// capability.
pub(crate) async fn run_settings_get(client: &ApiClient) -> anyhow::Result<()> {
    let settings = client.get_settings().await?;
    print_settings(&settings);
    Ok(())
}

/// Apply a sparse settings update and print what the server persisted.
///
/// # Errors
///
/// Returns an error if no field was provided, the CSS file cannot be read,
/// or the request fails.
pub(crate) async fn run_settings_set(
    client: &ApiClient,
    label: Option<String>,
    custom_css: Option<String>,
    custom_css_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let custom_css = match (custom_css, custom_css_file) {
        (Some(css), _) => Some(css),
        (None, Some(path)) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let patch = SettingsPatch { label, custom_css };
    if patch.is_empty() {
        anyhow::bail!("nothing to update; pass --label and/or --custom-css");
    }

    let settings = client.update_settings(&patch).await?;
    println!("settings updated");
    print_settings(&settings);
    Ok(())
}

/// Check server and database health.
///
/// # Errors
///
/// Returns an error if the server cannot be reached.
pub(crate) async fn run_health(client: &ApiClient) -> anyhow::Result<()> {
    let health = client.health().await?;
    println!("status:   {}", health.status);
    println!("database: {}", health.database);
    Ok(())
}

/// Load a catalog fixture into the database, creating it if needed.
///
/// # Errors
///
/// Returns an error if the fixture fails validation, `DATABASE_URL` is
/// unset, or any write fails.
pub(crate) async fn run_seed(catalog_path: &Path) -> anyhow::Result<()> {
    let catalog = msrp_core::catalog::load_catalog(catalog_path)
        .with_context(|| format!("failed to load {}", catalog_path.display()))?;

    let pool = msrp_db::connect_pool_from_env().await?;
    let applied = msrp_db::run_migrations(&pool).await?;
    if applied > 0 {
        println!("applied {applied} migrations");
    }

    let summary = msrp_db::seed_catalog(&pool, &catalog).await?;
    println!(
        "seeded {} products, {} variations, {} list prices",
        summary.products, summary.variations, summary.price_meta
    );
    Ok(())
}
