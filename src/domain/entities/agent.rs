use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Busy,
    Away,
    #[default]
    Offline,
}

impl AgentStatus {
    /// Presence states that can take new conversations.
    pub const ASSIGNABLE: [AgentStatus; 2] = [AgentStatus::Online, AgentStatus::Busy];

    pub fn is_assignable(&self) -> bool {
        Self::ASSIGNABLE.contains(self)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Online => write!(f, "online"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Away => write!(f, "away"),
            AgentStatus::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(AgentStatus::Online),
            "busy" => Ok(AgentStatus::Busy),
            "away" => Ok(AgentStatus::Away),
            "offline" => Ok(AgentStatus::Offline),
            _ => Err(format!("Invalid agent status: {}", s)),
        }
    }
}

/// Human support user. Presence is owned by the identity subsystem; routing
/// only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub status: AgentStatus,
    pub created_at: String,
}

impl Agent {
    pub fn new(name: String, email: String, status: AgentStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            is_active: true,
            status,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.is_active && self.status.is_assignable()
    }
}

/// Public identity of an assigned agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            email: agent.email.clone(),
        }
    }
}
