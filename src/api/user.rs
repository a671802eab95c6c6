use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::infrastructure::middleware::Vc;
use crate::infrastructure::security::SESSION_COOKIE;
use crate::models::UserId;
use crate::services::{FollowOutcome, ProfileEdit};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProfileRequest {
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub is_private: Option<bool>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// Http-only session cookie carrying the token.
fn session_cookie(token: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(max_age)
        .build()
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .accounts
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully.",
            "user": user
        })),
    ))
}

pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (profile, token) = state.accounts.login(&req.email, &req.password).await?;
    let cookie = session_cookie(
        token,
        time::Duration::seconds(state.sessions.ttl().num_seconds()),
        state.config.auth.secure_cookies,
    );
    Ok((
        jar.add(cookie),
        Json(json!({
            "success": true,
            "message": format!("Welcome back {}", profile.username),
            "user": profile
        })),
    ))
}

pub async fn logout_handler(jar: CookieJar) -> impl IntoResponse {
    let mut expired = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    expired.make_removal();
    (
        jar.add(expired),
        Json(json!({
            "success": true,
            "message": "Logged out successfully."
        })),
    )
}

pub async fn profile_handler(
    _vc: Vc,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<Value>> {
    let user = state.accounts.profile(id).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

pub async fn edit_profile_handler(
    vc: Vc,
    State(state): State<AppState>,
    Json(req): Json<EditProfileRequest>,
) -> AppResult<Json<Value>> {
    let edit = ProfileEdit {
        bio: req.bio,
        gender: req.gender,
        is_private: req.is_private,
        profile_picture: req.profile_picture,
    };
    let user = state.accounts.edit_profile(vc.user_id, edit).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated.",
        "user": user
    })))
}

pub async fn suggested_handler(vc: Vc, State(state): State<AppState>) -> AppResult<Json<Value>> {
    let users = state.accounts.suggested_users(vc.user_id).await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn search_handler(
    vc: Vc,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Value>> {
    let users = state.accounts.search_users(vc.user_id, &params.query).await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn follow_or_unfollow_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(target): Path<UserId>,
) -> AppResult<Json<Value>> {
    let outcome = state.graph.toggle_follow(vc.user_id, target).await?;
    let message = match outcome {
        FollowOutcome::Followed => "Followed successfully",
        FollowOutcome::Unfollowed => "Unfollowed successfully",
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "type": outcome.as_str()
    })))
}

pub async fn followers_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<Value>> {
    let followers = state.graph.list_followers(id).await?;
    Ok(Json(json!({ "success": true, "followers": followers })))
}

pub async fn following_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<Value>> {
    let following = state.graph.list_following(id).await?;
    Ok(Json(json!({ "success": true, "following": following })))
}

pub async fn remove_user_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(target): Path<UserId>,
) -> AppResult<Json<Value>> {
    let report = state.removal.remove_user(vc.user_id, target).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User and all related data deleted successfully",
        "removed": report
    })))
}
