use crate::domain::entities::{
    ChatFlow, ChatFlowDetail, ChatFlowPage, ChatFlowQuery, ConversationSummary,
    CreateChatFlowRequest, UpdateChatFlowRequest, WidgetConfig,
};
use crate::domain::events::SystemEvent;
use crate::domain::ports::{
    chat_flow_repository::ChatFlowRepository, conversation_repository::ConversationRepository,
    event_bus::EventBus,
};
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use std::sync::Arc;

const CHAT_ID_TAKEN: &str = "Chat ID already exists. Please choose a different one.";

#[derive(Clone)]
pub struct ChatFlowService {
    chat_flow_repo: Arc<dyn ChatFlowRepository>,
    conversation_repo: Arc<dyn ConversationRepository>,
    event_bus: Arc<dyn EventBus>,
}

impl ChatFlowService {
    pub fn new(
        chat_flow_repo: Arc<dyn ChatFlowRepository>,
        conversation_repo: Arc<dyn ConversationRepository>,
        event_bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            chat_flow_repo,
            conversation_repo,
            event_bus,
        }
    }

    pub async fn create_chat_flow(&self, request: CreateChatFlowRequest) -> ApiResult<ChatFlow> {
        request.validate()?;

        if self
            .chat_flow_repo
            .get_chat_flow_by_chat_id(&request.chat_id)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(CHAT_ID_TAKEN.to_string()));
        }

        let chat_flow = ChatFlow::new(request);

        // A concurrent create can still trip the unique index.
        self.chat_flow_repo
            .create_chat_flow(&chat_flow)
            .await
            .map_err(|e| match e {
                ApiError::Conflict(_) => ApiError::Conflict(CHAT_ID_TAKEN.to_string()),
                other => other,
            })?;

        tracing::info!(
            "Chat flow {} created with chat id {}",
            chat_flow.id,
            chat_flow.chat_id
        );
        self.publish(SystemEvent::ChatFlowCreated {
            chat_flow_id: chat_flow.id.clone(),
            chat_id: chat_flow.chat_id.clone(),
            timestamp: chat_flow.created_at.clone(),
        });

        Ok(chat_flow)
    }

    pub async fn get_chat_flow(&self, id: &str) -> ApiResult<ChatFlowDetail> {
        let chat_flow = self.require_chat_flow(id).await?;
        let conversations = self
            .conversation_repo
            .list_conversations_for_chat_flow(id)
            .await?;

        Ok(ChatFlowDetail {
            chat_flow,
            conversations: conversations.iter().map(ConversationSummary::from).collect(),
        })
    }

    pub async fn list_chat_flows(&self, query: ChatFlowQuery) -> ApiResult<ChatFlowPage> {
        query.validate()?;

        let (data, total) = self.chat_flow_repo.list_chat_flows(&query).await?;

        Ok(ChatFlowPage {
            data,
            total,
            limit: query.limit(),
            offset: query.offset(),
        })
    }

    pub async fn update_chat_flow(
        &self,
        id: &str,
        request: UpdateChatFlowRequest,
    ) -> ApiResult<ChatFlow> {
        let mut chat_flow = self.require_chat_flow(id).await?;
        chat_flow.apply_update(request)?;

        self.chat_flow_repo.update_chat_flow(&chat_flow).await?;

        tracing::info!("Chat flow {} updated", chat_flow.id);
        self.publish(SystemEvent::ChatFlowUpdated {
            chat_flow_id: chat_flow.id.clone(),
            timestamp: chat_flow.updated_at.clone(),
        });

        Ok(chat_flow)
    }

    pub async fn update_chat_flow_status(&self, id: &str, is_active: bool) -> ApiResult<ChatFlow> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.chat_flow_repo
            .update_chat_flow_status(id, is_active, &updated_at)
            .await?;

        tracing::info!("Chat flow {} is_active set to {}", id, is_active);
        self.publish(SystemEvent::ChatFlowUpdated {
            chat_flow_id: id.to_string(),
            timestamp: updated_at,
        });

        self.require_chat_flow(id).await
    }

    pub async fn delete_chat_flow(&self, id: &str) -> ApiResult<()> {
        self.chat_flow_repo.delete_chat_flow(id).await?;

        tracing::info!("Chat flow {} deleted", id);
        self.publish(SystemEvent::ChatFlowDeleted {
            chat_flow_id: id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });

        Ok(())
    }

    /// Public widget settings. Inactive flows are not served.
    pub async fn get_widget_config(&self, chat_flow_id: &str) -> ApiResult<WidgetConfig> {
        let chat_flow = self.require_chat_flow(chat_flow_id).await?;

        if !chat_flow.is_active {
            return Err(ApiError::Forbidden("Chatflow is not active".to_string()));
        }

        Ok(WidgetConfig::from(chat_flow))
    }

    async fn require_chat_flow(&self, id: &str) -> ApiResult<ChatFlow> {
        self.chat_flow_repo
            .get_chat_flow_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Chatflow not found".to_string()))
    }

    fn publish(&self, event: SystemEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            tracing::warn!("Failed to publish chat flow event: {}", e);
        }
    }
}
