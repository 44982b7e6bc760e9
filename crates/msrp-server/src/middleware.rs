use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// What a bearer key is allowed to do. Admin covers everything an editor can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Editor,
}

/// The resolved caller, stored as a request extension on routes that decide
/// authorization per handler instead of rejecting at the middleware layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity {
    pub role: Option<Role>,
}

impl Identity {
    /// Whether the caller may save product price fields.
    #[must_use]
    pub fn can_edit_products(self) -> bool {
        matches!(self.role, Some(Role::Admin | Role::Editor))
    }

    /// Whether the caller may read or write plugin settings.
    #[must_use]
    pub fn can_manage_settings(self) -> bool {
        matches!(self.role, Some(Role::Admin))
    }
}

/// Bearer-key capability settings used by middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    admin_keys: Arc<HashSet<String>>,
    editor_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from explicit key sets. Auth is enabled whenever at
    /// least one key exists.
    #[must_use]
    pub fn new(admin_keys: HashSet<String>, editor_keys: HashSet<String>) -> Self {
        let enabled = !(admin_keys.is_empty() && editor_keys.is_empty());
        Self {
            admin_keys: Arc::new(admin_keys),
            editor_keys: Arc::new(editor_keys),
            enabled,
        }
    }

    /// Builds auth config from `MSRP_ADMIN_KEYS` / `MSRP_EDITOR_KEYS`
    /// (comma-separated bearer tokens).
    ///
    /// In development, empty/missing keys disable auth for local iteration.
    /// In non-development envs, empty/missing keys fail startup.
    ///
    /// # Errors
    ///
    /// Returns an error when no keys are configured outside development.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let admin_keys = parse_key_list(&std::env::var("MSRP_ADMIN_KEYS").unwrap_or_default());
        let editor_keys = parse_key_list(&std::env::var("MSRP_EDITOR_KEYS").unwrap_or_default());

        if admin_keys.is_empty() && editor_keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "MSRP_ADMIN_KEYS/MSRP_EDITOR_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self::new(HashSet::new(), HashSet::new()));
            }

            anyhow::bail!(
                "MSRP_ADMIN_KEYS or MSRP_EDITOR_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self::new(admin_keys, editor_keys))
    }

    /// Resolves a bearer token to its role. Admin keys win when a token
    /// appears in both lists.
    fn resolve(&self, token: &str) -> Option<Role> {
        if self.admin_keys.contains(token) {
            Some(Role::Admin)
        } else if self.editor_keys.contains(token) {
            Some(Role::Editor)
        } else {
            None
        }
    }
}

fn parse_key_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn middleware_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the caller's role without rejecting anyone.
///
/// Form-save routes decide per handler: an unauthorized form post must look
/// like a successful request that changed nothing, not like an auth failure.
pub async fn attach_identity(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let identity = if auth.enabled {
        let role = extract_bearer_token(req.headers().get(AUTHORIZATION))
            .and_then(|token| auth.resolve(token));
        Identity { role }
    } else {
        Identity {
            role: Some(Role::Admin),
        }
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Middleware requiring the admin capability.
///
/// Missing or unknown tokens get 401; a valid token without the capability
/// gets 403.
pub async fn require_admin(State(auth): State<AuthState>, req: Request, next: Next) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = extract_bearer_token(req.headers().get(AUTHORIZATION));
    match token.and_then(|t| auth.resolve(t)) {
        Some(Role::Admin) => next.run(req).await,
        Some(Role::Editor) => middleware_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin capability required",
        ),
        None => middleware_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware requiring the editor capability (admins qualify).
pub async fn require_editor(State(auth): State<AuthState>, req: Request, next: Next) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = extract_bearer_token(req.headers().get(AUTHORIZATION));
    match token.and_then(|t| auth.resolve(t)) {
        Some(Role::Admin | Role::Editor) => next.run(req).await,
        None => middleware_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return middleware_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> HashSet<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn auth_state_resolves_roles() {
        let auth = AuthState::new(keys(&["admin-key"]), keys(&["editor-key"]));
        assert!(auth.enabled);
        assert_eq!(auth.resolve("admin-key"), Some(Role::Admin));
        assert_eq!(auth.resolve("editor-key"), Some(Role::Editor));
        assert_eq!(auth.resolve("stranger"), None);
    }

    #[test]
    fn auth_state_prefers_admin_on_overlap() {
        let auth = AuthState::new(keys(&["shared-key"]), keys(&["shared-key"]));
        assert_eq!(auth.resolve("shared-key"), Some(Role::Admin));
    }

    #[test]
    fn auth_state_disabled_without_keys() {
        let auth = AuthState::new(HashSet::new(), HashSet::new());
        assert!(!auth.enabled);
    }

    #[test]
    fn identity_capabilities_follow_role() {
        let admin = Identity {
            role: Some(Role::Admin),
        };
        let editor = Identity {
            role: Some(Role::Editor),
        };
        let anonymous = Identity::default();

        assert!(admin.can_manage_settings());
        assert!(admin.can_edit_products());
        assert!(!editor.can_manage_settings());
        assert!(editor.can_edit_products());
        assert!(!anonymous.can_edit_products());
    }
}
