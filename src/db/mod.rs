//! Supabase persistence collaborator (PostgREST).
//!
//! Every operation here is best-effort from the pipeline's point of view:
//! callers log failures and continue. The bot never blocks a user-visible
//! reply on this layer.

use crate::error::DbError;
use crate::http::build_client;
use crate::llm::TurnRole;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

mod types;
pub use types::{AI_MODE_DISABLED, ConversationTurn, GroupConfig, PersonaConfig, UserProfile};

/// Conversation memory older than this is invisible to fetches and reaped by
/// the retention sweep.
pub const RETENTION_DAYS: i64 = 7;

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct Database {
    client: Client,
    rest_url: String,
    api_key: String,
}

impl Database {
    pub fn new(url: &str, key: &str) -> Self {
        Self {
            client: build_client(REQUEST_TIMEOUT_SECS),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn retention_cutoff() -> DateTime<Utc> {
        Utc::now() - Duration::days(RETENTION_DAYS)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DbError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DbError::Status { status, body });
        }
        Ok(response)
    }

    async fn select<T>(&self, table: &str, query: &[(&str, &str)]) -> Result<Vec<T>, DbError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<(), DbError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Insert tolerating a concurrent insert of the same key. Two tasks may
    /// both observe "absent" and both insert; the loser is ignored.
    async fn insert_if_absent(
        &self,
        table: &str,
        conflict_column: &str,
        row: &Value,
    ) -> Result<(), DbError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .query(&[("on_conflict", conflict_column)])
            .json(row)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    // ── Conversation turns ───────────────────────────────────────────────

    /// Ascending history for one user within the trailing retention window.
    pub async fn recent_history(&self, user_id: i64) -> Result<Vec<ConversationTurn>, DbError> {
        let cutoff = Self::retention_cutoff();
        self.select(
            "conversation_history",
            &[
                ("select", "user_id,role,content,created_at"),
                ("user_id", &format!("eq.{user_id}")),
                ("created_at", &format!("gte.{}", cutoff.to_rfc3339())),
                ("order", "created_at.asc"),
            ],
        )
        .await
    }

    pub async fn store_turn(
        &self,
        user_id: i64,
        role: TurnRole,
        content: &str,
    ) -> Result<(), DbError> {
        self.insert(
            "conversation_history",
            &serde_json::json!({
                "user_id": user_id,
                "role": role.as_str(),
                "content": content,
                "created_at": Utc::now().to_rfc3339(),
            }),
        )
        .await
    }

    /// Delete turns strictly older than the retention cutoff. Fetch uses `>=`
    /// on the same window, so a turn exactly at the boundary is still fetched
    /// and not yet deleted.
    pub async fn prune_history(&self, user_id: i64) -> Result<(), DbError> {
        let cutoff = Self::retention_cutoff();
        let response = self
            .client
            .delete(self.table_url("conversation_history"))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("created_at", format!("lt.{}", cutoff.to_rfc3339())),
            ])
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    // ── Persona ──────────────────────────────────────────────────────────

    /// The singleton persona row, or defaults when none is stored.
    pub async fn personality(&self) -> Result<PersonaConfig, DbError> {
        let rows: Vec<PersonaConfig> = self
            .select(
                "bot_personality",
                &[("select", "*"), ("id", "eq.1"), ("limit", "1")],
            )
            .await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    // ── User profiles ────────────────────────────────────────────────────

    pub async fn user_profile(&self, user_id: i64) -> Result<Option<UserProfile>, DbError> {
        let rows: Vec<UserProfile> = self
            .select(
                "user_profiles",
                &[
                    ("select", "*"),
                    ("user_id", &format!("eq.{user_id}")),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Look up a profile, lazily creating a default one on first contact.
    pub async fn ensure_user(&self, user_id: i64, username: &str) -> Result<UserProfile, DbError> {
        if let Some(profile) = self.user_profile(user_id).await? {
            return Ok(profile);
        }

        self.insert_if_absent(
            "user_profiles",
            "user_id",
            &serde_json::json!({
                "user_id": user_id,
                "username": username,
                "risk_score": 0,
                "status": "active",
            }),
        )
        .await?;

        Ok(UserProfile::placeholder(user_id, username))
    }

    // ── Group configs ────────────────────────────────────────────────────

    pub async fn group_config(&self, group_id: i64) -> Result<Option<GroupConfig>, DbError> {
        let rows: Vec<GroupConfig> = self
            .select(
                "group_configs",
                &[
                    ("select", "*"),
                    ("group_id", &format!("eq.{group_id}")),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Create the group record on first sighting. No flag value is written;
    /// absence of the flag counts as enabled.
    pub async fn ensure_group(&self, group_id: i64) -> Result<(), DbError> {
        self.insert_if_absent(
            "group_configs",
            "group_id",
            &serde_json::json!({ "group_id": group_id }),
        )
        .await
    }

    // ── Usage logs ───────────────────────────────────────────────────────

    pub async fn log_event(&self, event_type: &str, details: Value) -> Result<(), DbError> {
        self.insert(
            "bot_logs",
            &serde_json::json!({
                "event_type": event_type,
                "details": details,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{
        body_partial_json, header, headers, method, path, query_param, query_param_contains,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn database(server: &MockServer) -> Database {
        Database::new(&server.uri(), "service-key")
    }

    #[tokio::test]
    async fn personality_parses_row_and_ignores_extra_columns() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/bot_personality"))
            .and(query_param("id", "eq.1"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 1,
                "tone": "icy",
                "aggression_level": 9,
                "response_style": "drill-sergeant",
                "custom_phrases": ["hasta la vista"]
            }])))
            .mount(&server)
            .await;

        let persona = database(&server).await.personality().await.unwrap();
        assert_eq!(persona.tone, "icy");
        assert_eq!(persona.aggression_level, 9);
        assert_eq!(persona.custom_phrases, vec!["hasta la vista"]);
    }

    #[tokio::test]
    async fn personality_defaults_when_table_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/bot_personality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let persona = database(&server).await.personality().await.unwrap();
        assert_eq!(persona.tone, "cold");
        assert_eq!(persona.aggression_level, 5);
    }

    #[tokio::test]
    async fn history_fetch_uses_gte_window_ascending() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/conversation_history"))
            .and(query_param("user_id", "eq.42"))
            .and(query_param("order", "created_at.asc"))
            .and(query_param_contains("created_at", "gte."))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"user_id": 42, "role": "user", "content": "hi", "created_at": "2026-08-20T10:00:00Z"},
                {"user_id": 42, "role": "model", "content": "state your business", "created_at": "2026-08-20T10:00:05Z"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let history = database(&server).await.recent_history(42).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].content, "state your business");
    }

    #[tokio::test]
    async fn prune_uses_strict_lt_boundary() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/conversation_history"))
            .and(query_param("user_id", "eq.42"))
            .and(query_param_contains("created_at", "lt."))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        database(&server).await.prune_history(42).await.unwrap();
    }

    #[tokio::test]
    async fn store_turn_posts_role_string() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/conversation_history"))
            .and(body_partial_json(serde_json::json!({
                "user_id": 42,
                "role": "model",
                "content": "negative"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        database(&server)
            .await
            .store_turn(42, TurnRole::Model, "negative")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_user_returns_existing_profile_without_insert() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .and(query_param("user_id", "eq.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"user_id": 7, "username": "neo", "risk_score": 8.5, "status": "watched"}
            ])))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/user_profiles"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let profile = database(&server).await.ensure_user(7, "neo").await.unwrap();
        assert_eq!(profile.risk_score, 8.5);
        assert_eq!(profile.status, "watched");
    }

    #[tokio::test]
    async fn ensure_user_inserts_defaults_when_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/user_profiles"))
            .and(query_param("on_conflict", "user_id"))
            .and(headers(
                "Prefer",
                vec!["resolution=ignore-duplicates", "return=minimal"],
            ))
            .and(body_partial_json(serde_json::json!({
                "user_id": 7,
                "username": "neo",
                "risk_score": 0,
                "status": "active"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let profile = database(&server).await.ensure_user(7, "neo").await.unwrap();
        assert_eq!(profile.risk_score, 0.0);
        assert_eq!(profile.status, "active");
    }

    #[tokio::test]
    async fn group_lookup_and_lazy_creation() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/group_configs"))
            .and(query_param("group_id", "eq.-100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/group_configs"))
            .and(query_param("on_conflict", "group_id"))
            .and(body_partial_json(serde_json::json!({"group_id": -100})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let db = database(&server).await;
        assert!(db.group_config(-100).await.unwrap().is_none());
        db.ensure_group(-100).await.unwrap();
    }

    #[tokio::test]
    async fn failures_surface_as_status_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = database(&server).await.personality().await.unwrap_err();
        match err {
            DbError::Status { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn log_event_inserts_typed_row() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/bot_logs"))
            .and(body_partial_json(serde_json::json!({
                "event_type": "ai_reply",
                "details": {"user_id": 7}
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        database(&server)
            .await
            .log_event("ai_reply", serde_json::json!({"user_id": 7}))
            .await
            .unwrap();
    }
}
