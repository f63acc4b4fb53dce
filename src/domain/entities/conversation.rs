use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Waiting,
    Active,
    Closed,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationStatus::Waiting => write!(f, "waiting"),
            ConversationStatus::Active => write!(f, "active"),
            ConversationStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(ConversationStatus::Waiting),
            "active" => Ok(ConversationStatus::Active),
            "closed" => Ok(ConversationStatus::Closed),
            _ => Err(format!("Invalid conversation status: {}", s)),
        }
    }
}

/// Assignment-relevant view of a conversation. There is no transition back
/// to `Unassigned` in the routing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentState {
    Unassigned,
    Assigned,
}

/// A single customer chat session belonging to one ChatFlow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub chat_flow_id: String,
    pub visitor_name: Option<String>,
    pub visitor_email: Option<String>,
    pub status: ConversationStatus,
    pub agent_id: Option<String>,
    pub department: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn new(
        chat_flow_id: String,
        visitor_name: Option<String>,
        visitor_email: Option<String>,
    ) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            chat_flow_id,
            visitor_name,
            visitor_email,
            status: ConversationStatus::Active,
            agent_id: None,
            department: None,
            last_message_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn assignment_state(&self) -> AssignmentState {
        if self.agent_id.is_some() {
            AssignmentState::Assigned
        } else {
            AssignmentState::Unassigned
        }
    }
}

/// Lightweight listing used on chat-flow detail responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub status: ConversationStatus,
    pub created_at: String,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            status: conversation.status,
            created_at: conversation.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    pub chat_flow_id: String,
    pub visitor_name: Option<String>,
    pub visitor_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConversationStatusRequest {
    pub status: ConversationStatus,
}
