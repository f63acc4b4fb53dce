pub mod agent_repository;
pub mod chat_flow_repository;
pub mod conversation_repository;
pub mod event_bus;
