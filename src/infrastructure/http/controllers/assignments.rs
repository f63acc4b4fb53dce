use axum::{extract::State, routing::post, Json, Router};

use super::ApiEnvelope;
use crate::domain::entities::{AssignConversationRequest, AssignmentOutcome};
use crate::infrastructure::http::middleware::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/conversations/assign", post(assign_conversation))
}

// POST /api/live-talk/conversations/assign
//
// "Nobody available" is a normal outcome and answers 200 with `data: null`.
pub async fn assign_conversation(
    State(state): State<AppState>,
    Json(request): Json<AssignConversationRequest>,
) -> ApiResult<Json<ApiEnvelope<Option<AssignmentOutcome>>>> {
    if request.conversation_id.trim().is_empty() || request.customer_message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "conversationId and customerMessage are required".to_string(),
        ));
    }

    let outcome = state
        .assignment_service
        .assign_conversation(&request.conversation_id, &request.customer_message)
        .await?;

    let envelope = match outcome {
        Some(outcome) => {
            let message = format!(
                "Conversation assigned to {} ({} team)",
                outcome.assigned_agent.name, outcome.assigned_team
            );
            ApiEnvelope::with_message(message, Some(outcome))
        }
        None => ApiEnvelope::with_message("No agents available for assignment", None),
    };

    Ok(Json(envelope))
}
