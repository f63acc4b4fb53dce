use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::ApiEnvelope;
use crate::domain::entities::{
    Conversation, OpenConversationRequest, UpdateConversationStatusRequest,
};
use crate::infrastructure::http::middleware::{ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", post(open_conversation))
        .route("/conversations/:id", get(get_conversation))
        .route("/conversations/:id/status", put(update_conversation_status))
}

// POST /api/live-talk/conversations
pub async fn open_conversation(
    State(state): State<AppState>,
    Json(request): Json<OpenConversationRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<Conversation>>)> {
    let conversation = state.conversation_service.open_conversation(request).await?;
    Ok((StatusCode::CREATED, Json(ApiEnvelope::ok(conversation))))
}

// GET /api/live-talk/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<Conversation>>> {
    let conversation = state.conversation_service.get_conversation(&id).await?;
    Ok(Json(ApiEnvelope::ok(conversation)))
}

// PUT /api/live-talk/conversations/:id/status
pub async fn update_conversation_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateConversationStatusRequest>,
) -> ApiResult<Json<ApiEnvelope<Conversation>>> {
    let conversation = state
        .conversation_service
        .update_conversation_status(&id, request.status)
        .await?;
    Ok(Json(ApiEnvelope::ok(conversation)))
}
