//! Concurrent retrieval of the three independent context facts for a user:
//! recent history, persona configuration, and risk metadata. Each degrades
//! to its default independently; persistence being down never fails the
//! pipeline, it only makes the reply stateless.

use crate::db::{ConversationTurn, Database, PersonaConfig, UserProfile};

#[derive(Debug, Clone)]
pub struct MessageContext {
    pub history: Vec<ConversationTurn>,
    pub persona: PersonaConfig,
    pub user: UserProfile,
}

impl MessageContext {
    /// Stateless fallback when no persistence layer is configured.
    fn degraded(user_id: i64, username: &str) -> Self {
        Self {
            history: Vec::new(),
            persona: PersonaConfig::default(),
            user: UserProfile::placeholder(user_id, username),
        }
    }
}

pub async fn fetch_context(
    db: Option<&Database>,
    user_id: i64,
    username: &str,
) -> MessageContext {
    let Some(db) = db else {
        return MessageContext::degraded(user_id, username);
    };

    let (history, persona, user) = tokio::join!(
        db.recent_history(user_id),
        db.personality(),
        db.user_profile(user_id),
    );

    MessageContext {
        history: history.unwrap_or_else(|e| {
            tracing::warn!("history fetch failed, replying stateless: {e}");
            Vec::new()
        }),
        persona: persona.unwrap_or_else(|e| {
            tracing::warn!("persona fetch failed, using defaults: {e}");
            PersonaConfig::default()
        }),
        user: user
            .unwrap_or_else(|e| {
                tracing::warn!("user profile fetch failed, using defaults: {e}");
                None
            })
            .unwrap_or_else(|| UserProfile::placeholder(user_id, username)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn no_database_degrades_to_defaults() {
        let context = fetch_context(None, 42, "sarah").await;

        assert!(context.history.is_empty());
        assert_eq!(context.persona.tone, "cold");
        assert_eq!(context.persona.aggression_level, 5);
        assert_eq!(context.user.risk_score, 0.0);
        assert_eq!(context.user.status, "active");
    }

    #[tokio::test]
    async fn degraded_result_is_stable_across_calls() {
        let first = fetch_context(None, 42, "sarah").await;
        let second = fetch_context(None, 42, "sarah").await;

        assert_eq!(first.persona.tone, second.persona.tone);
        assert_eq!(first.user.status, second.user.status);
        assert_eq!(first.history.len(), second.history.len());
    }

    #[tokio::test]
    async fn unreachable_store_degrades_instead_of_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let db = Database::new(&server.uri(), "k");
        let context = fetch_context(Some(&db), 42, "sarah").await;

        assert!(context.history.is_empty());
        assert_eq!(context.persona.tone, "cold");
        assert_eq!(context.user.status, "active");
    }

    #[tokio::test]
    async fn partial_failure_degrades_only_the_failed_fact() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/conversation_history"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/bot_personality"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "tone": "icy", "aggression_level": 9, "response_style": "military"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"user_id": 42, "username": "sarah", "risk_score": 7.5, "status": "watched"}
            ])))
            .mount(&server)
            .await;

        let db = Database::new(&server.uri(), "k");
        let context = fetch_context(Some(&db), 42, "sarah").await;

        assert!(context.history.is_empty());
        assert_eq!(context.persona.tone, "icy");
        assert_eq!(context.user.risk_score, 7.5);
    }
}
