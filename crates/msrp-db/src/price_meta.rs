//! Database operations for the `price_meta` table.
//!
//! One row per owner (product or variation id) holding the stored list
//! price. Callers normalize values before writing; an empty submission is a
//! delete, never a stored empty string.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::DbError;

/// Fetches the stored list price for an owner, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_price_meta(pool: &SqlitePool, owner_id: i64) -> Result<Option<String>, DbError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM price_meta WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Writes an owner's list price, inserting or overwriting in place.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_price_meta(
    pool: &SqlitePool,
    owner_id: i64,
    value: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO price_meta (owner_id, value, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT (owner_id) DO UPDATE SET \
             value      = excluded.value, \
             updated_at = excluded.updated_at",
    )
    .bind(owner_id)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes an owner's list price. Returns `true` if a row was deleted.
///
/// Deleting an owner that has no row is a successful no-op; the save paths
/// call this for every blank submission.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_price_meta(pool: &SqlitePool, owner_id: i64) -> Result<bool, DbError> {
    let affected = sqlx::query("DELETE FROM price_meta WHERE owner_id = ?")
        .bind(owner_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Fetches the list prices of every variation of a product, keyed by
/// variation id. Variations without meta are absent from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variation_price_meta(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<BTreeMap<i64, String>, DbError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT v.id, pm.value \
         FROM variations v \
         JOIN price_meta pm ON pm.owner_id = v.id \
         WHERE v.product_id = ?",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
