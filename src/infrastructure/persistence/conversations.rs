use crate::domain::entities::{ChatFlowRouting, Conversation, ConversationStatus};
use crate::domain::ports::conversation_repository::ConversationRepository;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::infrastructure::persistence::chat_flows::parse_keyword_team_pairs;
use crate::infrastructure::persistence::Database;
use sqlx::any::AnyRow;
use sqlx::Row;

const CONVERSATION_COLUMNS: &str = "c.id, c.chat_flow_id, c.visitor_name, c.visitor_email,
    c.status, c.agent_id, c.department, c.last_message_at, c.created_at, c.updated_at";

fn row_to_conversation(row: &AnyRow) -> ApiResult<Conversation> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<ConversationStatus>()
        .map_err(ApiError::Internal)?;

    Ok(Conversation {
        id: row.try_get("id")?,
        chat_flow_id: row.try_get("chat_flow_id")?,
        visitor_name: row.try_get("visitor_name")?,
        visitor_email: row.try_get("visitor_email")?,
        status,
        agent_id: row.try_get("agent_id")?,
        department: row.try_get("department")?,
        last_message_at: row.try_get("last_message_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Database {
    async fn fetch_conversation(&self, id: &str) -> ApiResult<Option<Conversation>> {
        let sql = format!(
            "SELECT {} FROM conversations c WHERE c.id = ?",
            CONVERSATION_COLUMNS
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    async fn require_conversation(&self, id: &str) -> ApiResult<Conversation> {
        self.fetch_conversation(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Conversation {} not found", id)))
    }
}

#[async_trait::async_trait]
impl ConversationRepository for Database {
    async fn create_conversation(&self, conversation: &Conversation) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO conversations (id, chat_flow_id, visitor_name, visitor_email, status,
                                        agent_id, department, last_message_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.chat_flow_id)
        .bind(&conversation.visitor_name)
        .bind(&conversation.visitor_email)
        .bind(conversation.status.to_string())
        .bind(&conversation.agent_id)
        .bind(&conversation.department)
        .bind(&conversation.last_message_at)
        .bind(&conversation.created_at)
        .bind(&conversation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_conversation_by_id(&self, id: &str) -> ApiResult<Option<Conversation>> {
        self.fetch_conversation(id).await
    }

    async fn get_routing_context(
        &self,
        conversation_id: &str,
    ) -> ApiResult<Option<(Conversation, ChatFlowRouting)>> {
        let sql = format!(
            "SELECT {},
                    CAST(f.auto_assign_conversations AS INTEGER) AS auto_assign_conversations,
                    f.keyword_team_pairs,
                    f.fallback_team
             FROM conversations c
             INNER JOIN chat_flows f ON f.id = c.chat_flow_id
             WHERE c.id = ?",
            CONVERSATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let conversation = row_to_conversation(&row)?;
        let auto_assign: i64 = row.try_get("auto_assign_conversations")?;
        let pairs_json: Option<String> = row.try_get("keyword_team_pairs")?;
        let routing = ChatFlowRouting {
            keyword_team_pairs: parse_keyword_team_pairs(
                pairs_json.as_deref(),
                &conversation.chat_flow_id,
            ),
            chat_flow_id: conversation.chat_flow_id.clone(),
            auto_assign_conversations: auto_assign != 0,
            fallback_team: row.try_get("fallback_team")?,
        };

        Ok(Some((conversation, routing)))
    }

    async fn list_conversations_for_chat_flow(
        &self,
        chat_flow_id: &str,
    ) -> ApiResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {} FROM conversations c WHERE c.chat_flow_id = ? ORDER BY c.created_at DESC",
            CONVERSATION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(chat_flow_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_conversation).collect()
    }

    async fn count_active_for_agent(&self, agent_id: &str) -> ApiResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM conversations WHERE agent_id = ? AND status = ?",
        )
        .bind(agent_id)
        .bind(ConversationStatus::Active.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("count")?)
    }

    async fn update_assignment(
        &self,
        conversation_id: &str,
        agent_id: &str,
        team: &str,
        timestamp: &str,
    ) -> ApiResult<Conversation> {
        let result = sqlx::query(
            "UPDATE conversations
             SET agent_id = ?, department = ?, last_message_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(agent_id)
        .bind(team)
        .bind(timestamp)
        .bind(timestamp)
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }

        self.require_conversation(conversation_id).await
    }

    async fn assign_if_under_capacity(
        &self,
        conversation_id: &str,
        agent_id: &str,
        team: &str,
        timestamp: &str,
        max_active: i64,
    ) -> ApiResult<Option<Conversation>> {
        let result = sqlx::query(
            "UPDATE conversations
             SET agent_id = ?, department = ?, last_message_at = ?, updated_at = ?
             WHERE id = ?
               AND (SELECT COUNT(*) FROM conversations assigned
                    WHERE assigned.agent_id = ? AND assigned.status = ? AND assigned.id <> ?) < ?",
        )
        .bind(agent_id)
        .bind(team)
        .bind(timestamp)
        .bind(timestamp)
        .bind(conversation_id)
        .bind(agent_id)
        .bind(ConversationStatus::Active.to_string())
        .bind(conversation_id)
        .bind(max_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.require_conversation(conversation_id).await.map(Some)
    }

    async fn update_conversation_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> ApiResult<Conversation> {
        let result = sqlx::query("UPDATE conversations SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }

        self.require_conversation(conversation_id).await
    }
}
