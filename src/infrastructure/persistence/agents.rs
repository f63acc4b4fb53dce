use crate::domain::entities::{Agent, AgentStatus};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::infrastructure::persistence::Database;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

const AGENT_COLUMNS: &str =
    "a.id, a.name, a.email, CAST(a.is_active AS INTEGER) AS is_active, a.status, a.created_at";

fn row_to_agent(row: &AnyRow) -> ApiResult<Agent> {
    let status_str: String = row.try_get("status")?;
    let status = status_str.parse().unwrap_or_else(|e| {
        tracing::warn!("{}; treating agent as offline", e);
        AgentStatus::Offline
    });
    let is_active: i64 = row.try_get("is_active")?;

    Ok(Agent {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        is_active: is_active != 0,
        status,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AgentRepository for Database {
    async fn create_agent(&self, agent: &Agent) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO agents (id, name, email, is_active, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(&agent.email)
        .bind(agent.is_active)
        .bind(agent.status.to_string())
        .bind(&agent.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_eligible_agents(&self, team: Option<&str>) -> ApiResult<Vec<Agent>> {
        let status_placeholders = vec!["?"; AgentStatus::ASSIGNABLE.len()].join(", ");
        let team_clause = if team.is_some() {
            "AND EXISTS (SELECT 1 FROM agent_teams t
                         WHERE t.agent_id = a.id AND LOWER(t.team) = LOWER(?))"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {} FROM agents a
             WHERE a.is_active = 1 AND a.status IN ({}) {}
             ORDER BY a.created_at ASC, a.id ASC",
            AGENT_COLUMNS, status_placeholders, team_clause
        );

        let mut query = sqlx::query(&sql);
        for status in AgentStatus::ASSIGNABLE {
            query = query.bind(status.to_string());
        }
        if let Some(team) = team {
            query = query.bind(team);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_agent).collect()
    }

    async fn set_agent_active(&self, agent_id: &str, is_active: bool) -> ApiResult<()> {
        let result = sqlx::query("UPDATE agents SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Agent {} not found", agent_id)));
        }
        Ok(())
    }

    async fn add_team_membership(&self, agent_id: &str, team: &str) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO agent_teams (agent_id, team, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT (agent_id, team) DO NOTHING",
        )
        .bind(agent_id)
        .bind(team)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
