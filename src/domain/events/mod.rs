use crate::domain::entities::AssignmentMethod;

/// Events published after routing and chat-flow state changes
#[derive(Debug, Clone)]
pub enum SystemEvent {
    ConversationOpened {
        conversation_id: String,
        chat_flow_id: String,
        timestamp: String, // ISO 8601
    },
    ConversationAssigned {
        conversation_id: String,
        agent_id: String,
        team: String,
        method: AssignmentMethod,
        timestamp: String, // ISO 8601
    },
    ChatFlowCreated {
        chat_flow_id: String,
        chat_id: String,
        timestamp: String, // ISO 8601
    },
    ChatFlowUpdated {
        chat_flow_id: String,
        timestamp: String, // ISO 8601
    },
    ChatFlowDeleted {
        chat_flow_id: String,
        timestamp: String, // ISO 8601
    },
}

impl SystemEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SystemEvent::ConversationOpened { .. } => "conversation.opened",
            SystemEvent::ConversationAssigned { .. } => "conversation.assigned",
            SystemEvent::ChatFlowCreated { .. } => "chat_flow.created",
            SystemEvent::ChatFlowUpdated { .. } => "chat_flow.updated",
            SystemEvent::ChatFlowDeleted { .. } => "chat_flow.deleted",
        }
    }
}
