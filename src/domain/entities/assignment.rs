use serde::{Deserialize, Serialize};

use super::{Agent, AgentSummary, Conversation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentMethod {
    KeywordBased,
}

impl std::fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentMethod::KeywordBased => write!(f, "keyword-based"),
        }
    }
}

/// Candidate chosen by the load balancer together with the load it was
/// chosen at.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSelection {
    pub agent: Agent,
    pub active_load: i64,
}

/// Result of a committed keyword-based assignment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub conversation: Conversation,
    pub assigned_agent: AgentSummary,
    pub assigned_team: String,
    pub assignment_method: AssignmentMethod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignConversationRequest {
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub customer_message: String,
}
