//! Plugin settings handlers: read and patch the storefront label and
//! badge CSS. Both routes sit behind the admin capability.

use axum::{extract::State, Extension, Json};
use msrp_core::settings::{SettingKey, Settings, SettingsPatch};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// GET /api/v1/settings: the persisted settings, defaults applied for keys
/// never written.
pub(super) async fn get_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Settings>>, ApiError> {
    let settings = msrp_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: settings,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/settings: apply a sparse patch. Absent fields keep their
/// stored value; present fields are sanitized and written, empty included.
pub(super) async fn update_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SettingsPatch>,
) -> Result<Json<ApiResponse<Settings>>, ApiError> {
    let rid = &req_id.0;

    if let Some(ref label) = body.label {
        let cleaned = SettingKey::Label.sanitize(label);
        msrp_db::set_option(&state.pool, SettingKey::Label.as_str(), &cleaned)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
    }

    if let Some(ref css) = body.custom_css {
        let cleaned = SettingKey::CustomCss.sanitize(css);
        msrp_db::set_option(&state.pool, SettingKey::CustomCss.as_str(), &cleaned)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
    }

    let settings = msrp_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: settings,
        meta: ResponseMeta::new(req_id.0),
    }))
}
