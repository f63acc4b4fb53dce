use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use super::ApiEnvelope;
use crate::domain::entities::{
    ChatFlow, ChatFlowDetail, ChatFlowPage, ChatFlowQuery, CreateChatFlowRequest,
    UpdateChatFlowRequest, UpdateChatFlowStatusRequest,
};
use crate::infrastructure::http::middleware::{ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chatflows", get(list_chat_flows).post(create_chat_flow))
        .route(
            "/chatflows/:id",
            get(get_chat_flow)
                .put(update_chat_flow)
                .delete(delete_chat_flow),
        )
        .route("/chatflows/:id/status", put(update_chat_flow_status))
}

// POST /api/live-talk/chatflows
pub async fn create_chat_flow(
    State(state): State<AppState>,
    Json(request): Json<CreateChatFlowRequest>,
) -> ApiResult<(StatusCode, Json<ApiEnvelope<ChatFlow>>)> {
    let chat_flow = state.chat_flow_service.create_chat_flow(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::with_message(
            "Chatflow created successfully",
            chat_flow,
        )),
    ))
}

// GET /api/live-talk/chatflows
pub async fn list_chat_flows(
    State(state): State<AppState>,
    Query(query): Query<ChatFlowQuery>,
) -> ApiResult<Json<ApiEnvelope<ChatFlowPage>>> {
    let page = state.chat_flow_service.list_chat_flows(query).await?;
    Ok(Json(ApiEnvelope::ok(page)))
}

// GET /api/live-talk/chatflows/:id
pub async fn get_chat_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<ChatFlowDetail>>> {
    let detail = state.chat_flow_service.get_chat_flow(&id).await?;
    Ok(Json(ApiEnvelope::ok(detail)))
}

// PUT /api/live-talk/chatflows/:id
pub async fn update_chat_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateChatFlowRequest>,
) -> ApiResult<Json<ApiEnvelope<ChatFlow>>> {
    let chat_flow = state.chat_flow_service.update_chat_flow(&id, request).await?;

    Ok(Json(ApiEnvelope::with_message(
        "Chatflow updated successfully",
        chat_flow,
    )))
}

// PUT /api/live-talk/chatflows/:id/status
pub async fn update_chat_flow_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateChatFlowStatusRequest>,
) -> ApiResult<Json<ApiEnvelope<ChatFlow>>> {
    let chat_flow = state
        .chat_flow_service
        .update_chat_flow_status(&id, request.is_active)
        .await?;

    let message = if chat_flow.is_active {
        "Chatflow activated successfully"
    } else {
        "Chatflow deactivated successfully"
    };
    Ok(Json(ApiEnvelope::with_message(message, chat_flow)))
}

// DELETE /api/live-talk/chatflows/:id
pub async fn delete_chat_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiEnvelope<()>>> {
    state.chat_flow_service.delete_chat_flow(&id).await?;
    Ok(Json(ApiEnvelope::with_message(
        "Chatflow deleted successfully",
        (),
    )))
}
