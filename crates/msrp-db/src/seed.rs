//! Seeds the catalog mirror from a fixture file.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use msrp_core::catalog::CatalogFile;
use msrp_core::price::{normalize_price, PriceInput};

use crate::DbError;

/// What a seed run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: usize,
    pub variations: usize,
    pub price_meta: usize,
}

/// Upserts catalog fixture contents into the mirror, including any initial
/// list prices. Values that fail price normalization are skipped rather than
/// stored; [`msrp_core::catalog::load_catalog`] rejects them up front, so a
/// skip here means the caller bypassed validation.
///
/// All writes run inside a single transaction; if any operation fails the
/// entire batch is rolled back. Re-seeding the same fixture is idempotent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &SqlitePool, catalog: &CatalogFile) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();
    let now = Utc::now();

    for product in &catalog.products {
        sqlx::query(
            "INSERT INTO products (id, name, kind, default_attributes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                 name               = excluded.name, \
                 kind               = excluded.kind, \
                 default_attributes = excluded.default_attributes, \
                 updated_at         = excluded.updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.kind.as_str())
        .bind(Json(&product.default_attributes))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        summary.products += 1;

        for variation in &product.variations {
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
            .bind(product.id)
            .bind(Json(&variation.attributes))
            .bind(variation.is_available)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            summary.variations += 1;
        }
    }

    for (owner_id, raw) in &catalog.price_meta {
        let PriceInput::Value(value) = normalize_price(raw) else {
            continue;
        };
        sqlx::query(
            "INSERT INTO price_meta (owner_id, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (owner_id) DO UPDATE SET \
                 value      = excluded.value, \
                 updated_at = excluded.updated_at",
        )
        .bind(*owner_id)
        .bind(&value)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        summary.price_meta += 1;
    }

    tx.commit().await?;
    Ok(summary)
}
