use crate::domain::entities::Agent;
use crate::infrastructure::http::middleware::error::ApiResult;
use async_trait::async_trait;

/// Read side of the agent directory used by routing, plus the writes that
/// provision agents.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn create_agent(&self, agent: &Agent) -> ApiResult<()>;

    /// Active agents whose status is online or busy, oldest first.
    /// When `team` is given only agents holding a membership for it are returned.
    async fn list_eligible_agents(&self, team: Option<&str>) -> ApiResult<Vec<Agent>>;

    async fn set_agent_active(&self, agent_id: &str, is_active: bool) -> ApiResult<()>;

    async fn add_team_membership(&self, agent_id: &str, team: &str) -> ApiResult<()>;
}
