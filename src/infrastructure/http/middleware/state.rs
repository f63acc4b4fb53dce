use crate::application::services::{AssignmentService, ChatFlowService, ConversationService};
use crate::domain::ports::event_bus::EventBus;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat_flow_service: ChatFlowService,
    pub conversation_service: ConversationService,
    pub assignment_service: AssignmentService,
    pub event_bus: Arc<dyn EventBus>,
}
