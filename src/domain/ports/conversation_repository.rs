use crate::domain::entities::{ChatFlowRouting, Conversation, ConversationStatus};
use crate::infrastructure::http::middleware::error::ApiResult;

#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> ApiResult<()>;

    async fn get_conversation_by_id(&self, id: &str) -> ApiResult<Option<Conversation>>;

    /// Conversation joined with its ChatFlow's routing configuration in one read.
    async fn get_routing_context(
        &self,
        conversation_id: &str,
    ) -> ApiResult<Option<(Conversation, ChatFlowRouting)>>;

    async fn list_conversations_for_chat_flow(
        &self,
        chat_flow_id: &str,
    ) -> ApiResult<Vec<Conversation>>;

    /// Number of conversations assigned to the agent with status `active`.
    async fn count_active_for_agent(&self, agent_id: &str) -> ApiResult<i64>;

    /// Unconditionally writes agent, department and last-message time.
    /// Fails with NotFound when the conversation does not exist.
    async fn update_assignment(
        &self,
        conversation_id: &str,
        agent_id: &str,
        team: &str,
        timestamp: &str,
    ) -> ApiResult<Conversation>;

    /// Same write as `update_assignment`, but only lands while the agent's
    /// active load (excluding this conversation) is below `max_active`.
    /// Returns `None` when the condition failed.
    async fn assign_if_under_capacity(
        &self,
        conversation_id: &str,
        agent_id: &str,
        team: &str,
        timestamp: &str,
        max_active: i64,
    ) -> ApiResult<Option<Conversation>>;

    async fn update_conversation_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> ApiResult<Conversation>;
}
