mod helpers;

use async_trait::async_trait;
use futures::StreamExt;
use helpers::*;
use livetalk::application::services::AssignmentService;
use livetalk::config::RoutingConfig;
use livetalk::domain::entities::{
    Agent, AgentStatus, AssignmentMethod, AssignmentState, ChatFlowRouting, Conversation,
    ConversationStatus,
};
use livetalk::domain::events::SystemEvent;
use livetalk::domain::ports::agent_repository::AgentRepository;
use livetalk::domain::ports::conversation_repository::ConversationRepository;
use livetalk::domain::ports::event_bus::EventBus;
use livetalk::infrastructure::http::middleware::{ApiError, ApiResult};
use livetalk::infrastructure::persistence::Database;
use livetalk::LocalEventBus;
use std::sync::Arc;
use std::time::Duration;

/// Conversation store whose load query fails; every other call hits the database.
struct FailingLoadStore {
    inner: Database,
}

#[async_trait]
impl ConversationRepository for FailingLoadStore {
    async fn create_conversation(&self, conversation: &Conversation) -> ApiResult<()> {
        self.inner.create_conversation(conversation).await
    }

    async fn get_conversation_by_id(&self, id: &str) -> ApiResult<Option<Conversation>> {
        self.inner.get_conversation_by_id(id).await
    }

    async fn get_routing_context(
        &self,
        conversation_id: &str,
    ) -> ApiResult<Option<(Conversation, ChatFlowRouting)>> {
        self.inner.get_routing_context(conversation_id).await
    }

    async fn list_conversations_for_chat_flow(
        &self,
        chat_flow_id: &str,
    ) -> ApiResult<Vec<Conversation>> {
        self.inner.list_conversations_for_chat_flow(chat_flow_id).await
    }

    async fn count_active_for_agent(&self, _agent_id: &str) -> ApiResult<i64> {
        Err(ApiError::Internal("disk I/O error".to_string()))
    }

    async fn update_assignment(
        &self,
        conversation_id: &str,
        agent_id: &str,
        team: &str,
        timestamp: &str,
    ) -> ApiResult<Conversation> {
        self.inner
            .update_assignment(conversation_id, agent_id, team, timestamp)
            .await
    }

    async fn assign_if_under_capacity(
        &self,
        conversation_id: &str,
        agent_id: &str,
        team: &str,
        timestamp: &str,
        max_active: i64,
    ) -> ApiResult<Option<Conversation>> {
        self.inner
            .assign_if_under_capacity(conversation_id, agent_id, team, timestamp, max_active)
            .await
    }

    async fn update_conversation_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> ApiResult<Conversation> {
        self.inner
            .update_conversation_status(conversation_id, status)
            .await
    }
}

/// Directory that returns whatever agents it was seeded with, unfiltered.
struct StaticDirectory {
    agents: Vec<Agent>,
}

#[async_trait]
impl AgentRepository for StaticDirectory {
    async fn create_agent(&self, _agent: &Agent) -> ApiResult<()> {
        Ok(())
    }

    async fn list_eligible_agents(&self, _team: Option<&str>) -> ApiResult<Vec<Agent>> {
        Ok(self.agents.clone())
    }

    async fn set_agent_active(&self, _agent_id: &str, _is_active: bool) -> ApiResult<()> {
        Ok(())
    }

    async fn add_team_membership(&self, _agent_id: &str, _team: &str) -> ApiResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_keyword_routes_to_least_loaded_agent() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let bob = create_agent(&db, "Bob", AgentStatus::Busy, 2).await;
    load_agent(&db, &flow.id, &alice, 2).await;

    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "Where is my INVOICE?")
        .await
        .unwrap()
        .expect("conversation should be assigned");

    assert_eq!(outcome.assigned_team, "Billing");
    assert_eq!(outcome.assigned_agent.id, bob.id);
    assert_eq!(outcome.assignment_method, AssignmentMethod::KeywordBased);
    assert_eq!(outcome.conversation.agent_id.as_deref(), Some(bob.id.as_str()));

    let stored = reload_conversation(&db, &conversation.id).await;
    assert_eq!(stored.agent_id.as_deref(), Some(bob.id.as_str()));
    assert_eq!(stored.department.as_deref(), Some("Billing"));
    assert!(stored.last_message_at.is_some());
}

#[tokio::test]
async fn test_first_matching_rule_wins() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    // Matches both the Billing and the Tech rule; Billing is stored first.
    let outcome = service
        .assign_conversation(&conversation.id, "the app crashed while paying my invoice")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.assigned_team, "Billing");
}

#[tokio::test]
async fn test_unmatched_message_uses_fallback_team() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "hello there")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.assigned_team, "Support");
}

#[tokio::test]
async fn test_no_fallback_routes_to_general() {
    let db = setup_test_db().await;
    let mut request = chat_flow_request("no-fallback");
    request.fallback_team = None;
    let flow = create_chat_flow(&db, request).await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "hello there")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.assigned_team, "general");
}

#[tokio::test]
async fn test_auto_assign_disabled_leaves_conversation_untouched() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, false).await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap();

    assert!(outcome.is_none());
    let stored = reload_conversation(&db, &conversation.id).await;
    assert_eq!(stored, conversation);
}

#[tokio::test]
async fn test_no_eligible_agents_returns_none_without_write() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    create_agent(&db, "Away", AgentStatus::Away, 1).await;
    create_agent(&db, "Offline", AgentStatus::Offline, 2).await;
    let inactive = create_agent(&db, "Inactive", AgentStatus::Online, 3).await;
    db.set_agent_active(&inactive.id, false).await.unwrap();

    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap();

    assert!(outcome.is_none());
    let stored = reload_conversation(&db, &conversation.id).await;
    assert_eq!(stored.assignment_state(), AssignmentState::Unassigned);
    assert!(stored.department.is_none());
}

#[tokio::test]
async fn test_agents_at_capacity_are_skipped() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let bob = create_agent(&db, "Bob", AgentStatus::Online, 2).await;
    load_agent(&db, &flow.id, &alice, 3).await;
    load_agent(&db, &flow.id, &bob, 3).await;

    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(reload_conversation(&db, &conversation.id)
        .await
        .agent_id
        .is_none());
}

#[tokio::test]
async fn test_closed_conversations_free_capacity() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    load_agent(&db, &flow.id, &alice, 3).await;

    let assigned = db
        .list_conversations_for_chat_flow(&flow.id)
        .await
        .unwrap();
    close_conversation(&db, &assigned[0].id).await;

    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.assigned_agent.id, alice.id);
}

#[tokio::test]
async fn test_custom_concurrency_ceiling() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    load_agent(&db, &flow.id, &alice, 1).await;

    let routing = RoutingConfig {
        max_concurrent_chats: 1,
        ..RoutingConfig::default()
    };
    let service = assignment_service(&db, routing);

    assert!(service.find_best_available_agent("Billing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_ties_go_to_earliest_agent() {
    let db = setup_test_db().await;
    let first = create_agent(&db, "First", AgentStatus::Online, 1).await;
    create_agent(&db, "Second", AgentStatus::Online, 2).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let selection = service
        .find_best_available_agent("Billing")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(selection.agent.id, first.id);
    assert_eq!(selection.active_load, 0);
}

#[tokio::test]
async fn test_team_is_ignored_unless_filter_enabled() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let tech = create_agent_in_team(&db, "Tina", "Tech", 1).await;
    let billing = create_agent_in_team(&db, "Bill", "billing", 2).await;
    load_agent(&db, &flow.id, &billing, 1).await;

    let unfiltered = assignment_service(&db, RoutingConfig::default());
    let selection = unfiltered
        .find_best_available_agent("Billing")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selection.agent.id, tech.id);

    let filtered = assignment_service(
        &db,
        RoutingConfig {
            filter_by_team: true,
            ..RoutingConfig::default()
        },
    );
    let selection = filtered
        .find_best_available_agent("Billing")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selection.agent.id, billing.id);

    assert!(filtered
        .find_best_available_agent("Sales")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_reassignment_overwrites_previous_agent() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let bob = create_agent(&db, "Bob", AgentStatus::Online, 2).await;
    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let first = service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.assigned_agent.id, alice.id);

    // Alice now carries this conversation, so Bob is the least loaded.
    let second = service
        .assign_conversation(&conversation.id, "the app has a bug")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.assigned_agent.id, bob.id);
    assert_eq!(second.assigned_team, "Tech");

    let stored = reload_conversation(&db, &conversation.id).await;
    assert_eq!(stored.agent_id.as_deref(), Some(bob.id.as_str()));
    assert_eq!(stored.department.as_deref(), Some("Tech"));
}

#[tokio::test]
async fn test_unknown_conversation_returns_none() {
    let db = setup_test_db().await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let service = assignment_service(&db, RoutingConfig::default());

    let outcome = service
        .assign_conversation("does-not-exist", "refund please")
        .await
        .unwrap();

    assert!(outcome.is_none());
}

#[tokio::test]
async fn test_strict_capacity_mode_assigns() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    load_agent(&db, &flow.id, &alice, 2).await;
    let conversation = open_conversation(&db, &flow.id).await;

    let service = assignment_service(
        &db,
        RoutingConfig {
            strict_capacity: true,
            ..RoutingConfig::default()
        },
    );

    let outcome = service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.assigned_agent.id, alice.id);
    assert_eq!(db.count_active_for_agent(&alice.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_conditional_assignment_refuses_full_agent() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    load_agent(&db, &flow.id, &alice, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;

    let now = chrono::Utc::now().to_rfc3339();
    let refused = db
        .assign_if_under_capacity(&conversation.id, &alice.id, "Billing", &now, 1)
        .await
        .unwrap();
    assert!(refused.is_none());
    assert!(reload_conversation(&db, &conversation.id)
        .await
        .agent_id
        .is_none());

    let accepted = db
        .assign_if_under_capacity(&conversation.id, &alice.id, "Billing", &now, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted.agent_id.as_deref(), Some(alice.id.as_str()));
}

#[tokio::test]
async fn test_assignment_publishes_event() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    let alice = create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;

    let (state, event_bus) = test_state(&db, RoutingConfig::default());
    let mut events = event_bus.subscribe();

    state
        .assignment_service
        .assign_conversation(&conversation.id, "refund please")
        .await
        .unwrap()
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended")
        .expect("lagged");

    match event {
        SystemEvent::ConversationAssigned {
            conversation_id,
            agent_id,
            team,
            method,
            ..
        } => {
            assert_eq!(conversation_id, conversation.id);
            assert_eq!(agent_id, alice.id);
            assert_eq!(team, "Billing");
            assert_eq!(method, AssignmentMethod::KeywordBased);
        }
        other => panic!("Unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_routing_context_failure_is_an_error() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;
    let service = assignment_service(&db, RoutingConfig::default());

    db.pool().close().await;

    let result = service
        .assign_conversation(&conversation.id, "refund please")
        .await;
    assert!(matches!(result, Err(ApiError::Internal(_))));
}

#[tokio::test]
async fn test_agent_load_failure_is_an_error() {
    let db = setup_test_db().await;
    let flow = create_routing_flow(&db, true).await;
    create_agent(&db, "Alice", AgentStatus::Online, 1).await;
    let conversation = open_conversation(&db, &flow.id).await;

    let service = AssignmentService::new(
        Arc::new(FailingLoadStore { inner: db.clone() }),
        Arc::new(db.clone()),
        Arc::new(LocalEventBus::new(8)),
        RoutingConfig::default(),
    );

    let result = service
        .assign_conversation(&conversation.id, "refund please")
        .await;
    assert!(matches!(result, Err(ApiError::Internal(_))));

    let stored = reload_conversation(&db, &conversation.id).await;
    assert!(stored.agent_id.is_none());
}

#[tokio::test]
async fn test_ineligible_agents_from_directory_are_ignored() {
    let db = setup_test_db().await;

    let away = Agent::new(
        "Away".to_string(),
        "away@example.com".to_string(),
        AgentStatus::Away,
    );
    let mut inactive = Agent::new(
        "Inactive".to_string(),
        "inactive@example.com".to_string(),
        AgentStatus::Online,
    );
    inactive.is_active = false;

    let service = AssignmentService::new(
        Arc::new(db.clone()),
        Arc::new(StaticDirectory {
            agents: vec![away, inactive],
        }),
        Arc::new(LocalEventBus::new(8)),
        RoutingConfig::default(),
    );

    assert!(service
        .find_best_available_agent("Billing")
        .await
        .unwrap()
        .is_none());
}
