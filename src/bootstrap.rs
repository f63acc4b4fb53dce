use crate::application::services::{AssignmentService, ChatFlowService, ConversationService};
use crate::config::{Config, RoutingConfig};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::domain::ports::chat_flow_repository::ChatFlowRepository;
use crate::domain::ports::conversation_repository::ConversationRepository;
use crate::domain::ports::event_bus::EventBus;
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::persistence::Database;
use crate::shared::events::LocalEventBus;
use std::sync::Arc;

pub fn build_app_state(db: Database, config: &Config) -> AppState {
    let event_bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::new(config.event_bus_capacity));
    tracing::info!(
        "Event bus initialized with capacity {}",
        config.event_bus_capacity
    );

    build_app_state_with(db, config.routing.clone(), event_bus)
}

/// Wires services over one database and a caller-provided event bus.
pub fn build_app_state_with(
    db: Database,
    routing: RoutingConfig,
    event_bus: Arc<dyn EventBus>,
) -> AppState {
    let chat_flow_repo: Arc<dyn ChatFlowRepository> = Arc::new(db.clone());
    let conversation_repo: Arc<dyn ConversationRepository> = Arc::new(db.clone());
    let agent_repo: Arc<dyn AgentRepository> = Arc::new(db);

    tracing::info!(
        "Routing: max {} concurrent chats, team filter {}, strict capacity {}",
        routing.max_concurrent_chats,
        routing.filter_by_team,
        routing.strict_capacity
    );

    let chat_flow_service = ChatFlowService::new(
        chat_flow_repo.clone(),
        conversation_repo.clone(),
        event_bus.clone(),
    );
    let conversation_service = ConversationService::new(
        conversation_repo.clone(),
        chat_flow_repo,
        event_bus.clone(),
    );
    let assignment_service =
        AssignmentService::new(conversation_repo, agent_repo, event_bus.clone(), routing);

    AppState {
        chat_flow_service,
        conversation_service,
        assignment_service,
        event_bus,
    }
}
