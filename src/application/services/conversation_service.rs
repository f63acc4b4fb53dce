use crate::domain::entities::{Conversation, ConversationStatus, OpenConversationRequest};
use crate::domain::events::SystemEvent;
use crate::domain::ports::{
    chat_flow_repository::ChatFlowRepository, conversation_repository::ConversationRepository,
    event_bus::EventBus,
};
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: Arc<dyn ConversationRepository>,
    chat_flow_repo: Arc<dyn ChatFlowRepository>,
    event_bus: Arc<dyn EventBus>,
}

impl ConversationService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        chat_flow_repo: Arc<dyn ChatFlowRepository>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            conversation_repo,
            chat_flow_repo,
            event_bus,
        }
    }

    /// Opens an unassigned, active conversation on a chat flow.
    #[tracing::instrument(skip(self, request), fields(chat_flow_id = %request.chat_flow_id))]
    pub async fn open_conversation(
        &self,
        request: OpenConversationRequest,
    ) -> ApiResult<Conversation> {
        if request.chat_flow_id.trim().is_empty() {
            return Err(ApiError::BadRequest("chatFlowId is required".to_string()));
        }

        self.chat_flow_repo
            .get_chat_flow_by_id(&request.chat_flow_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Chatflow not found".to_string()))?;

        let conversation = Conversation::new(
            request.chat_flow_id,
            request.visitor_name,
            request.visitor_email,
        );
        self.conversation_repo
            .create_conversation(&conversation)
            .await?;

        tracing::info!(
            "Conversation {} opened on chat flow {}",
            conversation.id,
            conversation.chat_flow_id
        );
        if let Err(e) = self.event_bus.publish(SystemEvent::ConversationOpened {
            conversation_id: conversation.id.clone(),
            chat_flow_id: conversation.chat_flow_id.clone(),
            timestamp: conversation.created_at.clone(),
        }) {
            tracing::warn!("Failed to publish conversation event: {}", e);
        }

        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> ApiResult<Conversation> {
        self.conversation_repo
            .get_conversation_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Conversation {} not found", id)))
    }

    /// Closing or parking a conversation takes it out of its agent's active load.
    pub async fn update_conversation_status(
        &self,
        id: &str,
        status: ConversationStatus,
    ) -> ApiResult<Conversation> {
        let conversation = self
            .conversation_repo
            .update_conversation_status(id, status)
            .await?;

        tracing::info!("Conversation {} status changed to {}", id, status);
        Ok(conversation)
    }
}
