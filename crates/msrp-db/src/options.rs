//! Database operations for the `options` key/value store.
//!
//! Options hold the two plugin settings. Reads substitute defaults for
//! missing keys; absence of a row is not an error.

use sqlx::SqlitePool;

use msrp_core::settings::{SettingKey, Settings};

use crate::DbError;

/// Fetches a single option value. Missing keys return `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_option(pool: &SqlitePool, key: &str) -> Result<Option<String>, DbError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM options WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Writes a single option value, inserting or overwriting in place.
///
/// Empty strings are stored as-is; clearing a setting is an explicit write,
/// not a deletion.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn set_option(pool: &SqlitePool, key: &str, value: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO options (key, value) VALUES (?, ?) \
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Loads the full settings view, applying defaults for missing keys.
///
/// Defaults apply only when a key has never been written. A stored empty
/// string is an explicit value and comes back verbatim.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_settings(pool: &SqlitePool) -> Result<Settings, DbError> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM options WHERE key IN (?, ?)")
            .bind(SettingKey::Label.as_str())
            .bind(SettingKey::CustomCss.as_str())
            .fetch_all(pool)
            .await?;

    let mut settings = Settings::default();
    for (key, value) in rows {
        if key == SettingKey::Label.as_str() {
            settings.label = value;
        } else if key == SettingKey::CustomCss.as_str() {
            settings.custom_css = value;
        }
    }

    Ok(settings)
}
