mod catalog;
mod products;
mod settings;
mod storefront;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    attach_identity, enforce_rate_limit, request_id, require_admin, require_editor, AuthState,
    RateLimitState, RequestId,
};
use crate::token::TokenKeeper;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub tokens: TokenKeeper,
    pub presenter: PresenterSettings,
}

/// Display settings that come from server config rather than the option
/// store: the shop's currency symbol and how many decimals prices show.
#[derive(Debug, Clone)]
pub struct PresenterSettings {
    pub currency_symbol: String,
    pub price_decimals: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &msrp_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Price form submissions. These resolve the caller's identity but never
/// reject at the middleware layer: a post without the capability or with a
/// stale token must succeed with nothing applied.
fn form_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/products/{product_id}/price-form",
            post(products::save_product_price),
        )
        .route(
            "/api/v1/products/{product_id}/variations/{variation_id}/price-form",
            post(products::save_variation_price),
        )
        .route(
            "/api/v1/products/{product_id}/variations/price-form",
            post(products::save_all_variation_prices),
        )
        .layer(axum::middleware::from_fn_with_state(auth, attach_identity))
}

fn editor_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/products/{product_id}/edit-fields",
            get(products::get_edit_fields),
        )
        .route(
            "/api/v1/catalog/products/{product_id}",
            put(catalog::sync_product).delete(catalog::delete_product),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_editor)),
        )
}

fn admin_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_admin)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/storefront/products/{product_id}/badge",
            get(storefront::get_badge),
        )
        .route(
            "/api/v1/storefront/custom-css",
            get(storefront::get_custom_css),
        )
        .route(
            "/api/v1/storefront/variation-payloads",
            post(storefront::augment_variation_payloads),
        );

    Router::new()
        .merge(public_routes)
        .merge(form_router(auth.clone()))
        .merge(editor_router(auth.clone(), rate_limit.clone()))
        .merge(admin_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match msrp_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::to_bytes;
    use std::collections::HashSet;

    pub const ADMIN_KEY: &str = "test-admin-key";
    pub const EDITOR_KEY: &str = "test-editor-key";
    pub const TOKEN_SECRET: &str = "test-token-secret";

    pub fn test_state(pool: SqlitePool) -> AppState {
        AppState {
            pool,
            tokens: TokenKeeper::new(TOKEN_SECRET),
            presenter: PresenterSettings {
                currency_symbol: "$".to_string(),
                price_decimals: 2,
            },
        }
    }

    pub fn test_app(pool: SqlitePool) -> Router {
        let admin: HashSet<String> = [ADMIN_KEY.to_string()].into();
        let editor: HashSet<String> = [EDITOR_KEY.to_string()].into();
        build_app(
            test_state(pool),
            AuthState::new(admin, editor),
            default_rate_limit_state(),
        )
    }

    pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }
}
