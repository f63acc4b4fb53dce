use crate::config::RoutingConfig;
use crate::domain::entities::{
    Agent, AgentSelection, AgentSummary, AssignmentMethod, AssignmentOutcome, Conversation,
};
use crate::domain::events::SystemEvent;
use crate::domain::ports::{
    agent_repository::AgentRepository, conversation_repository::ConversationRepository,
    event_bus::EventBus,
};
use crate::domain::services::{pick_least_loaded, select_team};
use crate::infrastructure::http::middleware::error::ApiResult;
use std::sync::Arc;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAYS_MS: [u64; 3] = [50, 100, 200]; // Exponential backoff

/// Keyword-based routing: classifies the customer message into a team, picks
/// the least-loaded eligible agent and records the assignment.
#[derive(Clone)]
pub struct AssignmentService {
    conversation_repo: Arc<dyn ConversationRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    event_bus: Arc<dyn EventBus>,
    routing: RoutingConfig,
}

impl AssignmentService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        event_bus: Arc<dyn EventBus>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            conversation_repo,
            agent_repo,
            event_bus,
            routing,
        }
    }

    /// Least-loaded eligible agent, or `None` when nobody is online or
    /// everyone is at the concurrency ceiling.
    ///
    /// `team` only narrows the candidates when team filtering is enabled.
    pub async fn find_best_available_agent(
        &self,
        team: &str,
    ) -> ApiResult<Option<AgentSelection>> {
        let team_filter = self.routing.filter_by_team.then_some(team);
        let agents: Vec<Agent> = self
            .agent_repo
            .list_eligible_agents(team_filter)
            .await?
            .into_iter()
            .filter(Agent::is_eligible)
            .collect();

        if agents.is_empty() {
            tracing::debug!("No eligible agents for team {}", team);
            return Ok(None);
        }

        let mut candidates = Vec::with_capacity(agents.len());
        for agent in agents {
            let load = self
                .conversation_repo
                .count_active_for_agent(&agent.id)
                .await?;
            candidates.push((agent, load));
        }

        Ok(pick_least_loaded(
            candidates,
            self.routing.max_concurrent_chats,
        ))
    }

    /// Routes a conversation using its chat flow's keyword rules.
    ///
    /// Returns `Ok(None)` without writing anything when the conversation is
    /// unknown, its flow has auto-assignment switched off, or no agent has
    /// capacity. An existing assignment is overwritten.
    pub async fn assign_conversation(
        &self,
        conversation_id: &str,
        customer_message: &str,
    ) -> ApiResult<Option<AssignmentOutcome>> {
        let Some((_, routing)) = self
            .conversation_repo
            .get_routing_context(conversation_id)
            .await?
        else {
            tracing::debug!(
                "Conversation {} not found or has no chat flow, skipping assignment",
                conversation_id
            );
            return Ok(None);
        };

        if !routing.auto_assign_conversations {
            tracing::debug!(
                "Auto-assignment disabled for chat flow {}, skipping conversation {}",
                routing.chat_flow_id,
                conversation_id
            );
            metrics::counter!("livetalk_assignments_total", "outcome" => "skipped_disabled")
                .increment(1);
            return Ok(None);
        }

        let team = select_team(
            customer_message,
            &routing.keyword_team_pairs,
            routing.fallback_team.as_deref(),
        )
        .to_string();

        let committed = if self.routing.strict_capacity {
            self.commit_under_capacity(conversation_id, &team).await?
        } else {
            self.commit(conversation_id, &team).await?
        };

        let Some((conversation, agent)) = committed else {
            tracing::info!(
                "No agent with capacity for conversation {} (team {})",
                conversation_id,
                team
            );
            metrics::counter!("livetalk_assignments_total", "outcome" => "no_capacity")
                .increment(1);
            return Ok(None);
        };

        if let Err(e) = self.event_bus.publish(SystemEvent::ConversationAssigned {
            conversation_id: conversation.id.clone(),
            agent_id: agent.id.clone(),
            team: team.clone(),
            method: AssignmentMethod::KeywordBased,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }) {
            tracing::warn!("Failed to publish assignment event: {}", e);
        }
        metrics::counter!("livetalk_assignments_total", "outcome" => "assigned").increment(1);

        tracing::info!(
            "Conversation {} assigned to agent {} ({} team)",
            conversation.id,
            agent.id,
            team
        );

        Ok(Some(AssignmentOutcome {
            conversation,
            assigned_agent: AgentSummary::from(&agent),
            assigned_team: team,
            assignment_method: AssignmentMethod::KeywordBased,
        }))
    }

    // Read-then-write: two concurrent calls can both pick the same agent and
    // push it past the ceiling.
    async fn commit(
        &self,
        conversation_id: &str,
        team: &str,
    ) -> ApiResult<Option<(Conversation, Agent)>> {
        let Some(selection) = self.find_best_available_agent(team).await? else {
            return Ok(None);
        };

        let conversation = self
            .conversation_repo
            .update_assignment(
                conversation_id,
                &selection.agent.id,
                team,
                &chrono::Utc::now().to_rfc3339(),
            )
            .await?;

        Ok(Some((conversation, selection.agent)))
    }

    async fn commit_under_capacity(
        &self,
        conversation_id: &str,
        team: &str,
    ) -> ApiResult<Option<(Conversation, Agent)>> {
        for attempt in 0..=MAX_RETRIES {
            let Some(selection) = self.find_best_available_agent(team).await? else {
                return Ok(None);
            };

            let updated = self
                .conversation_repo
                .assign_if_under_capacity(
                    conversation_id,
                    &selection.agent.id,
                    team,
                    &chrono::Utc::now().to_rfc3339(),
                    self.routing.max_concurrent_chats,
                )
                .await?;

            if let Some(conversation) = updated {
                return Ok(Some((conversation, selection.agent)));
            }

            if attempt < MAX_RETRIES {
                let delay_ms = RETRY_DELAYS_MS[attempt as usize];
                tracing::info!(
                    "Agent {} filled up before conversation {} was committed (attempt {}), retrying in {}ms",
                    selection.agent.id,
                    conversation_id,
                    attempt + 1,
                    delay_ms
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
        }

        tracing::warn!(
            "Giving up on conversation {} after {} capacity conflicts",
            conversation_id,
            MAX_RETRIES + 1
        );
        Ok(None)
    }
}
