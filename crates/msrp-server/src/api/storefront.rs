//! Public storefront handlers: the list-price badge, the scoped CSS
//! override, and variation-payload augmentation for the price switcher.
//!
//! Everything here is read-only and unauthenticated; a missing or
//! unusable price resolves to `data: null` rather than an error.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use msrp_core::catalog::ProductKind;
use msrp_core::price::format_price;
use msrp_core::storefront::{
    augment_variation_payload, badge_html, custom_css_block, resolve_display_price, PageContext,
};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct BadgeView {
    pub product_id: i64,
    /// Which row the displayed value came from: the product itself for
    /// simple products, the default variation otherwise.
    pub owner_id: i64,
    pub value: String,
    pub formatted: String,
    pub label: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CssQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PayloadRequest {
    pub payloads: Vec<PayloadItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PayloadItem {
    pub variation_id: i64,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(super) struct AugmentedItem {
    pub variation_id: i64,
    pub payload: serde_json::Value,
    pub augmented: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/storefront/products/{product_id}/badge: the rendered badge,
/// or `data: null` when the product has no displayable list price.
pub(super) async fn get_badge(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<Option<BadgeView>>>, ApiError> {
    let rid = &req_id.0;

    let view = msrp_db::get_product_view(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(rid, "not_found", format!("product {product_id} not found"))
        })?;

    let meta: BTreeMap<i64, String> = match view.kind {
        ProductKind::Simple => msrp_db::get_price_meta(&state.pool, product_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?
            .map(|value| (product_id, value))
            .into_iter()
            .collect(),
        ProductKind::Variable => msrp_db::list_variation_price_meta(&state.pool, product_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?,
    };

    let Some(resolved) = resolve_display_price(&view, &meta) else {
        return badge_response(req_id, None);
    };

    // A stored value that no longer parses renders nothing rather than a
    // broken badge.
    let Some(formatted) = format_price(
        &state.presenter.currency_symbol,
        state.presenter.price_decimals,
        &resolved.value,
    ) else {
        return badge_response(req_id, None);
    };

    let settings = msrp_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let html = badge_html(&settings.label, &formatted);
    badge_response(
        req_id,
        Some(BadgeView {
            product_id,
            owner_id: resolved.owner_id,
            value: resolved.value,
            formatted,
            label: settings.label,
            html,
        }),
    )
}

fn badge_response(
    req_id: RequestId,
    view: Option<BadgeView>,
) -> Result<Json<ApiResponse<Option<BadgeView>>>, ApiError> {
    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/storefront/custom-css?page=…: the scoped style block for the
/// given page context, or `data: null` when nothing should be emitted.
pub(super) async fn get_custom_css(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CssQuery>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    let settings = msrp_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let page = PageContext::parse(query.page.as_deref().unwrap_or(""));
    let block = custom_css_block(page, &settings.custom_css);

    Ok(Json(ApiResponse {
        data: block,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/storefront/variation-payloads: attach stored list prices to
/// a batch of variation switcher payloads.
pub(super) async fn augment_variation_payloads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PayloadRequest>,
) -> Result<Json<ApiResponse<Vec<AugmentedItem>>>, ApiError> {
    let rid = &req_id.0;

    let mut items = Vec::with_capacity(body.payloads.len());
    for item in body.payloads {
        let meta = msrp_db::get_price_meta(&state.pool, item.variation_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;

        let mut payload = item.payload;
        let augmented = augment_variation_payload(&mut payload, meta.as_deref());
        items.push(AugmentedItem {
            variation_id: item.variation_id,
            payload,
            augmented,
        });
    }

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}
