//! Catalog sync handlers: the host pushes product snapshots here to keep
//! the mirrored tables current, and removes products it has deleted.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use msrp_core::catalog::{validate_snapshot, ProductKind, ProductSnapshot, Variation};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// A snapshot body; the product id comes from the path.
#[derive(Debug, Deserialize)]
pub(super) struct SyncProductRequest {
    pub name: String,
    pub kind: ProductKind,
    #[serde(default)]
    pub default_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncView {
    pub product_id: i64,
    pub variations_upserted: usize,
    pub variations_pruned: usize,
}

/// PUT /api/v1/catalog/products/{product_id}: upsert a product snapshot,
/// pruning variations (and their price meta) the snapshot dropped.
pub(super) async fn sync_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
    Json(body): Json<SyncProductRequest>,
) -> Result<Json<ApiResponse<SyncView>>, ApiError> {
    let rid = &req_id.0;

    let snapshot = ProductSnapshot {
        id: product_id,
        name: body.name,
        kind: body.kind,
        default_attributes: body.default_attributes,
        variations: body.variations,
    };

    validate_snapshot(&snapshot)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let outcome = msrp_db::sync_product(&state.pool, &snapshot)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        product_id,
        upserted = outcome.variations_upserted,
        pruned = outcome.variations_pruned,
        "catalog snapshot applied"
    );

    Ok(Json(ApiResponse {
        data: SyncView {
            product_id,
            variations_upserted: outcome.variations_upserted,
            variations_pruned: outcome.variations_pruned,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/catalog/products/{product_id}: remove a product, its
/// variations, and every related list price.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;

    let deleted = msrp_db::delete_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(
            rid,
            "not_found",
            format!("product {product_id} not found"),
        ));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{response_json, test_app, EDITOR_KEY};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    fn put_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {EDITOR_KEY}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {EDITOR_KEY}"))
            .body(Body::empty())
            .expect("request")
    }

    async fn stored_meta(pool: &SqlitePool, owner_id: i64) -> Option<String> {
        msrp_db::get_price_meta(pool, owner_id)
            .await
            .expect("read price meta")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_creates_product_with_variations(pool: SqlitePool) {
        let body = serde_json::json!({
            "name": "Seltzer Variety Pack",
            "kind": "variable",
            "default_attributes": { "size": "small" },
            "variations": [
                { "id": 101, "attributes": { "size": "small" } },
                { "id": 102, "attributes": { "size": "large" } },
            ],
        });

        let app = test_app(pool.clone());
        let response = app
            .oneshot(put_json("/api/v1/catalog/products/100", &body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["data"]["product_id"].as_i64(), Some(100));
        assert_eq!(json["data"]["variations_upserted"].as_u64(), Some(2));
        assert_eq!(json["data"]["variations_pruned"].as_u64(), Some(0));

        let product = msrp_db::get_product(&pool, 100)
            .await
            .expect("query product");
        assert_eq!(product.map(|p| p.name), Some("Seltzer Variety Pack".into()));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_rejects_invalid_snapshot(pool: SqlitePool) {
        // A simple product carrying variations violates the snapshot rules.
        let body = serde_json::json!({
            "name": "Tincture",
            "kind": "simple",
            "variations": [ { "id": 2 } ],
        });

        let app = test_app(pool.clone());
        let response = app
            .oneshot(put_json("/api/v1/catalog/products/1", &body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));

        let product = msrp_db::get_product(&pool, 1).await.expect("query product");
        assert!(product.is_none(), "invalid snapshot must not be stored");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_rejects_empty_name(pool: SqlitePool) {
        let body = serde_json::json!({ "name": "   ", "kind": "simple" });

        let app = test_app(pool);
        let response = app
            .oneshot(put_json("/api/v1/catalog/products/1", &body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn resync_prunes_dropped_variation_and_its_price(pool: SqlitePool) {
        let app = test_app(pool.clone());

        let body = serde_json::json!({
            "name": "Seltzer",
            "kind": "variable",
            "default_attributes": { "size": "small" },
            "variations": [
                { "id": 101, "attributes": { "size": "small" } },
                { "id": 102, "attributes": { "size": "large" } },
            ],
        });
        let response = app
            .clone()
            .oneshot(put_json("/api/v1/catalog/products/100", &body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        msrp_db::upsert_price_meta(&pool, 101, "19.99")
            .await
            .expect("seed meta");
        msrp_db::upsert_price_meta(&pool, 102, "34.99")
            .await
            .expect("seed meta");

        // Resync without variation 101.
        let body = serde_json::json!({
            "name": "Seltzer",
            "kind": "variable",
            "default_attributes": { "size": "large" },
            "variations": [
                { "id": 102, "attributes": { "size": "large" } },
            ],
        });
        let response = app
            .clone()
            .oneshot(put_json("/api/v1/catalog/products/100", &body))
            .await
            .expect("response");

        let json = response_json(response).await;
        assert_eq!(json["data"]["variations_pruned"].as_u64(), Some(1));
        assert_eq!(stored_meta(&pool, 101).await, None);
        assert_eq!(stored_meta(&pool, 102).await.as_deref(), Some("34.99"));

        // The badge now resolves through the surviving variation.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/storefront/products/100/badge")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("badge response");
        let json = response_json(response).await;
        assert_eq!(json["data"]["owner_id"].as_i64(), Some(102));
        assert_eq!(json["data"]["formatted"].as_str(), Some("$34.99"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn delete_product_removes_prices(pool: SqlitePool) {
        let app = test_app(pool.clone());

        let body = serde_json::json!({ "name": "Tincture", "kind": "simple" });
        let response = app
            .clone()
            .oneshot(put_json("/api/v1/catalog/products/42", &body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        msrp_db::upsert_price_meta(&pool, 42, "24.99")
            .await
            .expect("seed meta");

        let response = app
            .clone()
            .oneshot(delete("/api/v1/catalog/products/42"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["data"]["deleted"].as_bool(), Some(true));
        assert_eq!(stored_meta(&pool, 42).await, None);

        // A second delete finds nothing.
        let response = app
            .oneshot(delete("/api/v1/catalog/products/42"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_requires_bearer_token(pool: SqlitePool) {
        let body = serde_json::json!({ "name": "Tincture", "kind": "simple" });
        let app = test_app(pool.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/api/v1/catalog/products/42")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let product = msrp_db::get_product(&pool, 42).await.expect("query product");
        assert!(product.is_none());
    }
}
