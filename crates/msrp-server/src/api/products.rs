//! Product price handlers: the edit-field fragments and the three
//! form-save endpoints (simple, single variation, bulk variations).
//!
//! Form saves are gated before anything else is looked up. A post that
//! fails the capability or token check gets a 200 with `applied: false`
//! and zero stored changes, so an unauthorized caller can neither write
//! nor probe which products exist.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use msrp_core::catalog::ProductKind;
use msrp_core::price::{normalize_price, PriceInput};
use msrp_core::render::{
    render_simple_field, render_token_field, render_variation_field, RenderContext,
    SIMPLE_FIELD_NAME, VARIATION_FIELD_NAME,
};

use crate::middleware::{Identity, RequestId};
use crate::token::TokenKeeper;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Token action covering the simple-product price form.
pub(super) const SIMPLE_SAVE_ACTION: &str = "save-product-price";
/// Token action covering both variation save endpoints.
pub(super) const VARIATION_SAVE_ACTION: &str = "save-variation-prices";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ProductPriceForm {
    pub token: Option<String>,
    /// Absent field: nothing was submitted for this product. Empty string:
    /// clear the stored price.
    pub list_price: Option<String>,
}

/// Body for saving one variation row. The value is looked up by the row's
/// loop index in `prices`, mirroring how the host posts indexed fields.
#[derive(Debug, Deserialize)]
pub(super) struct VariationPriceForm {
    pub token: Option<String>,
    pub index: usize,
    #[serde(default)]
    pub prices: BTreeMap<usize, String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkPriceForm {
    pub token: Option<String>,
    /// `None` means the post carried no price rows at all; stored values
    /// stay untouched. An empty map also changes nothing.
    pub prices: Option<BTreeMap<usize, String>>,
    #[serde(default)]
    pub variation_ids: BTreeMap<usize, i64>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct EditFieldsView {
    pub product_id: i64,
    pub kind: &'static str,
    pub label: String,
    pub token: String,
    pub html: String,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Serialize)]
pub(super) struct FieldView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<i64>,
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct FormSaveView {
    pub applied: bool,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
}

impl FormSaveView {
    /// A post that failed the capability or token gate. Status stays 200 so
    /// the response is indistinguishable from a save that changed nothing.
    fn not_applied() -> Self {
        Self {
            applied: false,
            updated: 0,
            deleted: 0,
            skipped: 0,
        }
    }

    /// An accepted post that carried nothing to change.
    fn no_change() -> Self {
        Self {
            applied: true,
            updated: 0,
            deleted: 0,
            skipped: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_allowed(
    identity: Identity,
    tokens: &TokenKeeper,
    token: Option<&str>,
    action: &str,
    owner_id: i64,
) -> bool {
    identity.can_edit_products() && token.is_some_and(|t| tokens.verify(t, action, owner_id))
}

fn product_not_found(rid: &str, product_id: i64) -> ApiError {
    ApiError::new(rid, "not_found", format!("product {product_id} not found"))
}

fn form_response(
    req_id: RequestId,
    view: FormSaveView,
) -> Result<Json<ApiResponse<FormSaveView>>, ApiError> {
    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Applies one submitted price value to an owner row and reports the change
/// as (updated, deleted, skipped) counts.
async fn apply_price_value(
    pool: &SqlitePool,
    owner_id: i64,
    raw: &str,
) -> Result<(usize, usize, usize), msrp_db::DbError> {
    match normalize_price(raw) {
        PriceInput::Value(value) => {
            msrp_db::upsert_price_meta(pool, owner_id, &value).await?;
            Ok((1, 0, 0))
        }
        PriceInput::Empty => {
            let existed = msrp_db::delete_price_meta(pool, owner_id).await?;
            Ok((0, usize::from(existed), 0))
        }
        PriceInput::Rejected => Ok((0, 0, 1)),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/products/{product_id}/edit-fields: rendered field fragments
/// plus a fresh write token for the product's pricing form.
pub(super) async fn get_edit_fields(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<EditFieldsView>>, ApiError> {
    let rid = &req_id.0;

    let view = msrp_db::get_product_view(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| product_not_found(rid, product_id))?;

    let settings = msrp_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let (token, html, fields) = match view.kind {
        ProductKind::Simple => {
            let token = state.tokens.issue(SIMPLE_SAVE_ACTION, product_id);
            let value = msrp_db::get_price_meta(&state.pool, product_id)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?;

            let mut ctx = RenderContext::new();
            let html = render_simple_field(&mut ctx, &settings.label, value.as_deref(), &token)
                .unwrap_or_default();
            let fields = vec![FieldView {
                name: SIMPLE_FIELD_NAME.to_string(),
                variation_id: None,
                value,
            }];
            (token, html, fields)
        }
        ProductKind::Variable => {
            let token = state.tokens.issue(VARIATION_SAVE_ACTION, product_id);
            let meta = msrp_db::list_variation_price_meta(&state.pool, product_id)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?;

            let mut html = String::new();
            let mut fields = Vec::with_capacity(view.variations.len());
            for (index, variation) in view.variations.iter().enumerate() {
                let value = meta.get(&variation.id).cloned();
                html.push_str(&render_variation_field(
                    index,
                    &settings.label,
                    value.as_deref(),
                ));
                fields.push(FieldView {
                    name: format!("{VARIATION_FIELD_NAME}[{index}]"),
                    variation_id: Some(variation.id),
                    value,
                });
            }
            html.push_str(&render_token_field(&token));
            (token, html, fields)
        }
    };

    Ok(Json(ApiResponse {
        data: EditFieldsView {
            product_id,
            kind: view.kind.as_str(),
            label: settings.label,
            token,
            html,
            fields,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products/{product_id}/price-form: save a simple product's
/// list price.
pub(super) async fn save_product_price(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<i64>,
    Json(body): Json<ProductPriceForm>,
) -> Result<Json<ApiResponse<FormSaveView>>, ApiError> {
    let rid = &req_id.0;

    if !write_allowed(
        identity,
        &state.tokens,
        body.token.as_deref(),
        SIMPLE_SAVE_ACTION,
        product_id,
    ) {
        return form_response(req_id, FormSaveView::not_applied());
    }

    if msrp_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .is_none()
    {
        return Err(product_not_found(rid, product_id));
    }

    let Some(raw) = body.list_price else {
        return form_response(req_id, FormSaveView::no_change());
    };

    let (updated, deleted, skipped) = apply_price_value(&state.pool, product_id, &raw)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    form_response(
        req_id,
        FormSaveView {
            applied: true,
            updated,
            deleted,
            skipped,
        },
    )
}

/// POST /api/v1/products/{product_id}/variations/{variation_id}/price-form:
/// save a single variation row, with the value resolved by its loop index.
pub(super) async fn save_variation_price(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(identity): Extension<Identity>,
    Path((product_id, variation_id)): Path<(i64, i64)>,
    Json(body): Json<VariationPriceForm>,
) -> Result<Json<ApiResponse<FormSaveView>>, ApiError> {
    let rid = &req_id.0;

    if !write_allowed(
        identity,
        &state.tokens,
        body.token.as_deref(),
        VARIATION_SAVE_ACTION,
        product_id,
    ) {
        return form_response(req_id, FormSaveView::not_applied());
    }

    if msrp_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .is_none()
    {
        return Err(product_not_found(rid, product_id));
    }

    let owned = msrp_db::get_variation(&state.pool, variation_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .is_some_and(|v| v.product_id == product_id);
    if !owned {
        return Err(ApiError::new(
            rid,
            "not_found",
            format!("variation {variation_id} not found for product {product_id}"),
        ));
    }

    let Some(raw) = body.prices.get(&body.index) else {
        return form_response(req_id, FormSaveView::no_change());
    };

    let (updated, deleted, skipped) = apply_price_value(&state.pool, variation_id, raw)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    form_response(
        req_id,
        FormSaveView {
            applied: true,
            updated,
            deleted,
            skipped,
        },
    )
}

/// POST /api/v1/products/{product_id}/variations/price-form: save every
/// submitted variation row in one request.
pub(super) async fn save_all_variation_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<i64>,
    Json(body): Json<BulkPriceForm>,
) -> Result<Json<ApiResponse<FormSaveView>>, ApiError> {
    let rid = &req_id.0;

    if !write_allowed(
        identity,
        &state.tokens,
        body.token.as_deref(),
        VARIATION_SAVE_ACTION,
        product_id,
    ) {
        return form_response(req_id, FormSaveView::not_applied());
    }

    if msrp_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .is_none()
    {
        return Err(product_not_found(rid, product_id));
    }

    let Some(prices) = body.prices else {
        return form_response(req_id, FormSaveView::no_change());
    };

    let mut view = FormSaveView::no_change();
    for (index, raw) in &prices {
        // Rows that cannot be paired with a variation of this product are
        // counted and left alone rather than failing the whole post.
        let Some(&variation_id) = body.variation_ids.get(index) else {
            view.skipped += 1;
            continue;
        };

        let owned = msrp_db::get_variation(&state.pool, variation_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?
            .is_some_and(|v| v.product_id == product_id);
        if !owned {
            view.skipped += 1;
            continue;
        }

        let (updated, deleted, skipped) = apply_price_value(&state.pool, variation_id, raw)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        view.updated += updated;
        view.deleted += deleted;
        view.skipped += skipped;
    }

    form_response(req_id, view)
}
