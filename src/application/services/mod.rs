pub mod assignment_service;
pub mod chat_flow_service;
pub mod conversation_service;

pub use assignment_service::AssignmentService;
pub use chat_flow_service::ChatFlowService;
pub use conversation_service::ConversationService;
