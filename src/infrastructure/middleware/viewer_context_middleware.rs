// ViewerContext middleware - resolves the session token into a request-scoped viewer
// Handlers behind it extract `Vc`; anything without a valid session is rejected with 401

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::infrastructure::security::{SessionKeys, SESSION_COOKIE};
use crate::infrastructure::viewer::ViewerContext;

/// Application state that can verify session tokens.
pub trait HasSessionKeys {
    fn session_keys(&self) -> &SessionKeys;
}

pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasSessionKeys + Clone + Send + Sync + 'static,
{
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;
    let user_id = app_state.session_keys().verify(&token)?;

    let viewer = ViewerContext::new(user_id, format!("req-{}", Uuid::new_v4()));
    tracing::debug!(request_id = %viewer.request_id, user_id, "Resolved viewer");
    request.extensions_mut().insert(Arc::new(viewer));

    Ok(next.run(request).await)
}

/// Session cookie first, then `Authorization: Bearer`.
pub(crate) fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
