use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::Vc;
use crate::models::PostId;
use crate::services::BookmarkOutcome;

#[derive(Debug, Deserialize)]
pub struct AddPostRequest {
    #[serde(default)]
    pub caption: String,
    /// Url of an already uploaded image.
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn add_post_handler(
    vc: Vc,
    State(state): State<AppState>,
    Json(req): Json<AddPostRequest>,
) -> AppResult<impl IntoResponse> {
    let post = state.content.create_post(vc.user_id, &req.caption, &req.image).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "New post added",
            "post": post
        })),
    ))
}

pub async fn feed_handler(vc: Vc, State(state): State<AppState>) -> AppResult<Json<Value>> {
    let posts = state.content.feed(vc.user_id).await?;
    Ok(Json(json!({ "success": true, "posts": posts })))
}

pub async fn user_posts_handler(vc: Vc, State(state): State<AppState>) -> AppResult<Json<Value>> {
    let posts = state.content.posts_by_author(vc.user_id).await?;
    Ok(Json(json!({ "success": true, "posts": posts })))
}

pub async fn like_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> AppResult<Json<Value>> {
    state.content.like(vc.user_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Post liked" })))
}

pub async fn dislike_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> AppResult<Json<Value>> {
    state.content.unlike(vc.user_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Post disliked" })))
}

pub async fn add_comment_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(req): Json<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let comment = state.content.add_comment(vc.user_id, id, &req.text).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment added",
            "comment": comment
        })),
    ))
}

pub async fn comments_handler(
    _vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> AppResult<Json<Value>> {
    let comments = state.content.comments_of_post(id).await?;
    Ok(Json(json!({ "success": true, "comments": comments })))
}

pub async fn delete_post_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> AppResult<Json<Value>> {
    state.content.delete_post(vc.user_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Post deleted" })))
}

pub async fn bookmark_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> AppResult<Json<Value>> {
    let outcome = state.content.bookmark_toggle(vc.user_id, id).await?;
    let message = match outcome {
        BookmarkOutcome::Saved => "Post bookmarked",
        BookmarkOutcome::Unsaved => "Post removed from bookmark",
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "type": outcome.as_str()
    })))
}
