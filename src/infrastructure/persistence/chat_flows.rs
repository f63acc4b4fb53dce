use crate::domain::entities::{ChatFlow, ChatFlowQuery, ChatFlowSettings, KeywordTeamPair};
use crate::domain::ports::chat_flow_repository::ChatFlowRepository;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::infrastructure::persistence::Database;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row};

const CHAT_FLOW_COLUMNS: &str = "id, chat_id, name, company_name, owner_user_id,
    CAST(auto_assign_conversations AS INTEGER) AS auto_assign_conversations,
    keyword_team_pairs, fallback_team, CAST(is_active AS INTEGER) AS is_active,
    settings, created_at, updated_at";

/// Decodes stored routing rules. Rows written before write-time validation may
/// hold arbitrary JSON. Each element is read on its own: a malformed element
/// becomes an inert rule, and only a non-array value degrades to "no rules".
pub(crate) fn parse_keyword_team_pairs(raw: Option<&str>, chat_flow_id: &str) -> Vec<KeywordTeamPair> {
    let Some(json) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => items.iter().map(pair_from_value).collect(),
        Ok(other) => {
            tracing::warn!(
                "Ignoring keyword_team_pairs on chat flow {}: expected an array, found {}",
                chat_flow_id,
                other
            );
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(
                "Ignoring unreadable keyword_team_pairs on chat flow {}: {}",
                chat_flow_id,
                e
            );
            Vec::new()
        }
    }
}

// Missing or non-string fields read as empty, which leaves the rule inert.
fn pair_from_value(value: &Value) -> KeywordTeamPair {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    KeywordTeamPair::new(field("keyword"), field("team"))
}

fn row_to_chat_flow(row: &AnyRow) -> ApiResult<ChatFlow> {
    let id: String = row.try_get("id")?;
    let pairs_json: Option<String> = row.try_get("keyword_team_pairs")?;
    let settings_json: String = row.try_get("settings")?;
    let settings: ChatFlowSettings = serde_json::from_str(&settings_json)
        .map_err(|e| ApiError::Internal(format!("Failed to parse chat flow settings: {}", e)))?;
    let auto_assign: i64 = row.try_get("auto_assign_conversations")?;
    let is_active: i64 = row.try_get("is_active")?;

    Ok(ChatFlow {
        keyword_team_pairs: parse_keyword_team_pairs(pairs_json.as_deref(), &id),
        id,
        chat_id: row.try_get("chat_id")?,
        name: row.try_get("name")?,
        company_name: row.try_get("company_name")?,
        owner_user_id: row.try_get("owner_user_id")?,
        auto_assign_conversations: auto_assign != 0,
        fallback_team: row.try_get("fallback_team")?,
        is_active: is_active != 0,
        settings,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn filter_clause(query: &ChatFlowQuery) -> String {
    let mut conditions = Vec::new();
    if query.owner_user_id.is_some() {
        conditions.push("owner_user_id = ?");
    }
    if query.is_active.is_some() {
        conditions.push("is_active = ?");
    }
    if query.chat_id.is_some() {
        conditions.push("chat_id = ?");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

// Binds in the same order `filter_clause` emits placeholders.
fn bind_filters<'q>(
    mut statement: Query<'q, Any, AnyArguments<'q>>,
    query: &'q ChatFlowQuery,
) -> Query<'q, Any, AnyArguments<'q>> {
    if let Some(owner) = &query.owner_user_id {
        statement = statement.bind(owner.as_str());
    }
    if let Some(is_active) = query.is_active {
        statement = statement.bind(is_active);
    }
    if let Some(chat_id) = &query.chat_id {
        statement = statement.bind(chat_id.as_str());
    }
    statement
}

fn serialize_pairs(chat_flow: &ChatFlow) -> ApiResult<String> {
    serde_json::to_string(&chat_flow.keyword_team_pairs)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize keyword_team_pairs: {}", e)))
}

fn serialize_settings(chat_flow: &ChatFlow) -> ApiResult<String> {
    serde_json::to_string(&chat_flow.settings)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize chat flow settings: {}", e)))
}

#[async_trait]
impl ChatFlowRepository for Database {
    async fn create_chat_flow(&self, chat_flow: &ChatFlow) -> ApiResult<()> {
        let pairs = serialize_pairs(chat_flow)?;
        let settings = serialize_settings(chat_flow)?;

        sqlx::query(
            "INSERT INTO chat_flows (id, chat_id, name, company_name, owner_user_id,
                                     auto_assign_conversations, keyword_team_pairs, fallback_team,
                                     is_active, settings, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&chat_flow.id)
        .bind(&chat_flow.chat_id)
        .bind(&chat_flow.name)
        .bind(&chat_flow.company_name)
        .bind(&chat_flow.owner_user_id)
        .bind(chat_flow.auto_assign_conversations)
        .bind(&pairs)
        .bind(&chat_flow.fallback_team)
        .bind(chat_flow.is_active)
        .bind(&settings)
        .bind(&chat_flow.created_at)
        .bind(&chat_flow.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_chat_flow_by_id(&self, id: &str) -> ApiResult<Option<ChatFlow>> {
        let sql = format!("SELECT {} FROM chat_flows WHERE id = ?", CHAT_FLOW_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(row_to_chat_flow).transpose()
    }

    async fn get_chat_flow_by_chat_id(&self, chat_id: &str) -> ApiResult<Option<ChatFlow>> {
        let sql = format!("SELECT {} FROM chat_flows WHERE chat_id = ?", CHAT_FLOW_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_chat_flow).transpose()
    }

    async fn list_chat_flows(&self, query: &ChatFlowQuery) -> ApiResult<(Vec<ChatFlow>, i64)> {
        let where_clause = filter_clause(query);

        let list_sql = format!(
            "SELECT {} FROM chat_flows {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            CHAT_FLOW_COLUMNS, where_clause
        );
        let rows = bind_filters(sqlx::query(&list_sql), query)
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        let chat_flows = rows
            .iter()
            .map(row_to_chat_flow)
            .collect::<ApiResult<Vec<_>>>()?;

        let count_sql = format!("SELECT COUNT(*) AS count FROM chat_flows {}", where_clause);
        let count_row = bind_filters(sqlx::query(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = count_row.try_get("count")?;

        Ok((chat_flows, total))
    }

    async fn update_chat_flow(&self, chat_flow: &ChatFlow) -> ApiResult<()> {
        let pairs = serialize_pairs(chat_flow)?;
        let settings = serialize_settings(chat_flow)?;

        let result = sqlx::query(
            "UPDATE chat_flows
             SET name = ?, company_name = ?, owner_user_id = ?, auto_assign_conversations = ?,
                 keyword_team_pairs = ?, fallback_team = ?, is_active = ?, settings = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&chat_flow.name)
        .bind(&chat_flow.company_name)
        .bind(&chat_flow.owner_user_id)
        .bind(chat_flow.auto_assign_conversations)
        .bind(&pairs)
        .bind(&chat_flow.fallback_team)
        .bind(chat_flow.is_active)
        .bind(&settings)
        .bind(&chat_flow.updated_at)
        .bind(&chat_flow.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Chatflow not found".to_string()));
        }
        Ok(())
    }

    async fn update_chat_flow_status(
        &self,
        id: &str,
        is_active: bool,
        updated_at: &str,
    ) -> ApiResult<()> {
        let result = sqlx::query("UPDATE chat_flows SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Chatflow not found".to_string()));
        }
        Ok(())
    }

    async fn delete_chat_flow(&self, id: &str) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;

        // foreign_keys is a per-connection pragma, so the cascade is done here as well.
        sqlx::query("DELETE FROM conversations WHERE chat_flow_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM chat_flows WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Chatflow not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::select_team;

    #[test]
    fn test_unreadable_pairs_degrade_to_empty() {
        assert!(parse_keyword_team_pairs(Some("{\"not\":\"an array\"}"), "flow-1").is_empty());
        assert!(parse_keyword_team_pairs(None, "flow-1").is_empty());
    }

    #[test]
    fn test_pairs_missing_fields_still_parse() {
        let pairs = parse_keyword_team_pairs(Some(r#"[{"keyword":"refund"},{"keyword":"x","team":"Ops"}]"#), "f");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].team, "");
        assert_eq!(pairs[1].team, "Ops");
    }

    #[test]
    fn test_malformed_element_does_not_drop_other_rules() {
        let pairs = parse_keyword_team_pairs(
            Some(r#"[{"keyword":"refund","team":"Billing"},{"keyword":null,"team":"Ops"},{"keyword":42,"team":"Tech"},"junk"]"#),
            "flow-1",
        );
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], KeywordTeamPair::new("refund", "Billing"));
        assert!(pairs[1..].iter().all(|pair| !pair.is_routable()));
        assert_eq!(
            select_team("I need a refund", &pairs, Some("Support")),
            "Billing"
        );
    }

    #[test]
    fn test_filter_clause_orders_conditions() {
        let query = ChatFlowQuery {
            owner_user_id: Some("owner".to_string()),
            chat_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_clause(&query), "WHERE owner_user_id = ? AND chat_id = ?");
        assert_eq!(filter_clause(&ChatFlowQuery::default()), "");
    }
}
