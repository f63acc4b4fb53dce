use livetalk::application::services::AssignmentService;
use livetalk::bootstrap::build_app_state_with;
use livetalk::config::RoutingConfig;
use livetalk::domain::entities::{
    Agent, AgentStatus, ChatFlow, ChatFlowSettings, Conversation, ConversationStatus,
    CreateChatFlowRequest, KeywordTeamPair,
};
use livetalk::domain::ports::agent_repository::AgentRepository;
use livetalk::domain::ports::chat_flow_repository::ChatFlowRepository;
use livetalk::domain::ports::conversation_repository::ConversationRepository;
use livetalk::infrastructure::http::middleware::AppState;
use livetalk::infrastructure::persistence::Database;
use livetalk::LocalEventBus;
use std::sync::Arc;

/// Agents are listed oldest first, so tests pin `created_at` to control order.
pub async fn create_agent(db: &Database, name: &str, status: AgentStatus, seq: u32) -> Agent {
    let mut agent = Agent::new(
        name.to_string(),
        format!("{}@example.com", name.to_lowercase()),
        status,
    );
    agent.created_at = format!("2026-01-01T00:00:{:02}Z", seq);

    db.create_agent(&agent)
        .await
        .expect("Failed to create agent");
    agent
}

pub async fn create_agent_in_team(
    db: &Database,
    name: &str,
    team: &str,
    seq: u32,
) -> Agent {
    let agent = create_agent(db, name, AgentStatus::Online, seq).await;
    db.add_team_membership(&agent.id, team)
        .await
        .expect("Failed to add team membership");
    agent
}

pub fn chat_flow_request(chat_id: &str) -> CreateChatFlowRequest {
    CreateChatFlowRequest {
        chat_id: chat_id.to_string(),
        name: format!("{} widget", chat_id),
        company_name: "Acme".to_string(),
        owner_user_id: "owner-1".to_string(),
        auto_assign_conversations: true,
        keyword_team_pairs: vec![
            KeywordTeamPair::new("refund, invoice", "Billing"),
            KeywordTeamPair::new("bug, crash", "Tech"),
        ],
        fallback_team: Some("Support".to_string()),
        is_active: true,
        settings: ChatFlowSettings::default(),
    }
}

pub async fn create_chat_flow(db: &Database, request: CreateChatFlowRequest) -> ChatFlow {
    let chat_flow = ChatFlow::new(request);
    db.create_chat_flow(&chat_flow)
        .await
        .expect("Failed to create chat flow");
    chat_flow
}

/// Flow with the Billing/Tech rules and a Support fallback.
pub async fn create_routing_flow(db: &Database, auto_assign: bool) -> ChatFlow {
    let mut request = chat_flow_request(&format!("flow-{}", uuid::Uuid::new_v4().simple()));
    request.auto_assign_conversations = auto_assign;
    create_chat_flow(db, request).await
}

pub async fn open_conversation(db: &Database, chat_flow_id: &str) -> Conversation {
    let conversation = Conversation::new(
        chat_flow_id.to_string(),
        Some("Visitor".to_string()),
        Some("visitor@example.com".to_string()),
    );
    db.create_conversation(&conversation)
        .await
        .expect("Failed to create conversation");
    conversation
}

/// Gives `agent` `count` active conversations on the flow.
pub async fn load_agent(db: &Database, chat_flow_id: &str, agent: &Agent, count: usize) {
    for _ in 0..count {
        let conversation = open_conversation(db, chat_flow_id).await;
        db.update_assignment(
            &conversation.id,
            &agent.id,
            "Support",
            &chrono::Utc::now().to_rfc3339(),
        )
        .await
        .expect("Failed to assign conversation");
    }
}

pub async fn close_conversation(db: &Database, conversation_id: &str) {
    db.update_conversation_status(conversation_id, ConversationStatus::Closed)
        .await
        .expect("Failed to close conversation");
}

pub async fn reload_conversation(db: &Database, conversation_id: &str) -> Conversation {
    db.get_conversation_by_id(conversation_id)
        .await
        .expect("Failed to load conversation")
        .expect("Conversation missing")
}

pub fn test_state(db: &Database, routing: RoutingConfig) -> (AppState, Arc<LocalEventBus>) {
    let event_bus = Arc::new(LocalEventBus::new(32));
    let state = build_app_state_with(db.clone(), routing, event_bus.clone());
    (state, event_bus)
}

pub fn assignment_service(db: &Database, routing: RoutingConfig) -> AssignmentService {
    test_state(db, routing).0.assignment_service
}
