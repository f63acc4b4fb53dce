use crate::domain::entities::{ChatFlow, ChatFlowQuery};
use crate::infrastructure::http::middleware::error::ApiResult;
use async_trait::async_trait;

#[async_trait]
pub trait ChatFlowRepository: Send + Sync {
    async fn create_chat_flow(&self, chat_flow: &ChatFlow) -> ApiResult<()>;

    async fn get_chat_flow_by_id(&self, id: &str) -> ApiResult<Option<ChatFlow>>;

    async fn get_chat_flow_by_chat_id(&self, chat_id: &str) -> ApiResult<Option<ChatFlow>>;

    /// Page of chat flows, newest first, with the total matching count.
    async fn list_chat_flows(&self, query: &ChatFlowQuery) -> ApiResult<(Vec<ChatFlow>, i64)>;

    async fn update_chat_flow(&self, chat_flow: &ChatFlow) -> ApiResult<()>;

    async fn update_chat_flow_status(
        &self,
        id: &str,
        is_active: bool,
        updated_at: &str,
    ) -> ApiResult<()>;

    /// Deletes the flow; its conversations go with it.
    async fn delete_chat_flow(&self, id: &str) -> ApiResult<()>;
}
