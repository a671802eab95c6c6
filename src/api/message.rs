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
use crate::models::UserId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text_message: String,
}

pub async fn send_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(receiver): Path<UserId>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let message = state
        .messaging
        .send_message(vc.user_id, receiver, &req.text_message)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "newMessage": message })),
    ))
}

pub async fn conversation_handler(
    vc: Vc,
    State(state): State<AppState>,
    Path(other): Path<UserId>,
) -> AppResult<Json<Value>> {
    let messages = state.messaging.get_messages(vc.user_id, other).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}
