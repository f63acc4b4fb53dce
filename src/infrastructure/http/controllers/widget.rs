use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::ApiEnvelope;
use crate::domain::entities::WidgetConfig;
use crate::infrastructure::http::middleware::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/widget/config", get(get_widget_config))
}

#[derive(Debug, Deserialize)]
pub struct WidgetConfigQuery {
    #[serde(rename = "chatflowId")]
    pub chatflow_id: Option<String>,
}

// GET /api/live-talk/widget/config?chatflowId=
pub async fn get_widget_config(
    State(state): State<AppState>,
    Query(query): Query<WidgetConfigQuery>,
) -> ApiResult<Json<ApiEnvelope<WidgetConfig>>> {
    let chatflow_id = query
        .chatflow_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("chatflowId is required".to_string()))?;

    let config = state.chat_flow_service.get_widget_config(&chatflow_id).await?;
    Ok(Json(ApiEnvelope::ok(config)))
}
