//! Database operations for the mirrored `products` and `variations` tables.
//!
//! The mirror is written only by catalog sync (and the seeder); every other
//! module reads it. Ids are the host's ids, never generated here.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use msrp_core::catalog::{ProductKind, ProductSnapshot, Variation};
use msrp_core::storefront::ProductView;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    /// Stored kind discriminator; constrained to `simple` or `variable`.
    pub kind: String,
    /// Default attribute selection, stored as a JSON object.
    pub default_attributes: Json<BTreeMap<String, String>>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// A row from the `variations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariationRow {
    pub id: i64,
    pub product_id: i64,
    /// Attribute name/value pairs, stored as a JSON object.
    pub attributes: Json<BTreeMap<String, String>>,
    pub is_available: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl VariationRow {
    /// Converts the row into the domain variation type.
    #[must_use]
    pub fn into_variation(self) -> Variation {
        Variation {
            id: self.id,
            attributes: self.attributes.0,
            is_available: self.is_available,
        }
    }
}

/// What a catalog sync changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub variations_upserted: usize,
    pub variations_pruned: usize,
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

/// Fetches a product row by host id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &SqlitePool, product_id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, kind, default_attributes, created_at, updated_at \
         FROM products WHERE id = ?",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches a variation row by host id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_variation(
    pool: &SqlitePool,
    variation_id: i64,
) -> Result<Option<VariationRow>, DbError> {
    let row = sqlx::query_as::<_, VariationRow>(
        "SELECT id, product_id, attributes, is_available, created_at, updated_at \
         FROM variations WHERE id = ?",
    )
    .bind(variation_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists a product's variations ordered by id, mirroring the host's stable
/// row order so indexed form fields line up across render and save.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variations(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<Vec<VariationRow>, DbError> {
    let rows = sqlx::query_as::<_, VariationRow>(
        "SELECT id, product_id, attributes, is_available, created_at, updated_at \
         FROM variations WHERE product_id = ? ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Assembles the storefront view of a product: kind, default selection, and
/// variations. Returns `None` for unknown products.
///
/// # Errors
///
/// Returns [`DbError::Corrupt`] if the stored kind discriminator is not
/// recognized, or [`DbError::Sqlx`] if a query fails.
pub async fn get_product_view(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<Option<ProductView>, DbError> {
    let Some(product) = get_product(pool, product_id).await? else {
        return Ok(None);
    };

    let kind = ProductKind::parse(&product.kind).ok_or_else(|| {
        DbError::Corrupt(format!(
            "product {product_id} has unknown kind '{}'",
            product.kind
        ))
    })?;

    let variations = match kind {
        ProductKind::Simple => Vec::new(),
        ProductKind::Variable => list_variations(pool, product_id)
            .await?
            .into_iter()
            .map(VariationRow::into_variation)
            .collect(),
    };

    Ok(Some(ProductView {
        id: product.id,
        kind,
        default_attributes: product.default_attributes.0,
        variations,
    }))
}

// ---------------------------------------------------------------------------
// Write operations
// ---------------------------------------------------------------------------

/// Applies a host catalog snapshot: upserts the product and its variations,
/// then prunes variations the snapshot no longer carries.
///
/// Pruned variations take their price meta with them; list prices for owners
/// the snapshot keeps are never touched. Runs in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn sync_product(
    pool: &SqlitePool,
    snapshot: &ProductSnapshot,
) -> Result<SyncOutcome, DbError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let mut outcome = SyncOutcome::default();

    sqlx::query(
        "INSERT INTO products (id, name, kind, default_attributes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (id) DO UPDATE SET \
             name               = excluded.name, \
             kind               = excluded.kind, \
             default_attributes = excluded.default_attributes, \
             updated_at         = excluded.updated_at",
    )
    .bind(snapshot.id)
    .bind(&snapshot.name)
    .bind(snapshot.kind.as_str())
    .bind(Json(&snapshot.default_attributes))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let mut kept_ids = HashSet::new();
    for variation in &snapshot.variations {
        sqlx::query(
            "INSERT INTO variations (id, product_id, attributes, is_available, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                 product_id   = excluded.product_id, \
                 attributes   = excluded.attributes, \
                 is_available = excluded.is_available, \
                 updated_at   = excluded.updated_at",
        )
        .bind(variation.id)
        .bind(snapshot.id)
        .bind(Json(&variation.attributes))
        .bind(variation.is_available)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        kept_ids.insert(variation.id);
        outcome.variations_upserted += 1;
    }

    let existing_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM variations WHERE product_id = ?")
            .bind(snapshot.id)
            .fetch_all(&mut *tx)
            .await?;

    for stale_id in existing_ids.into_iter().filter(|id| !kept_ids.contains(id)) {
        sqlx::query("DELETE FROM price_meta WHERE owner_id = ?")
            .bind(stale_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM variations WHERE id = ?")
            .bind(stale_id)
            .execute(&mut *tx)
            .await?;
        outcome.variations_pruned += 1;
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Removes a product, its variations, and every related price meta row.
///
/// Returns `true` if the product existed. Runs in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn delete_product(pool: &SqlitePool, product_id: i64) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM price_meta WHERE owner_id IN \
         (SELECT id FROM variations WHERE product_id = ?)",
    )
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM price_meta WHERE owner_id = ?")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM variations WHERE product_id = ?")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}
