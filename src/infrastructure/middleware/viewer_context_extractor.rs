// Vc extractor - handler-facing access to the request's ViewerContext

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Cheap-to-clone handle on the viewer resolved by `viewer_context_middleware`.
///
/// ```ignore
/// async fn handler(vc: Vc, State(state): State<AppState>) -> AppResult<Json<Value>> {
///     let posts = state.content.posts_by_author(vc.user_id).await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
    }
}
