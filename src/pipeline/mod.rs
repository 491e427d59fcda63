//! Response orchestration: gate, group/user state, context, generation,
//! delivery, then fire-and-forget persistence. The user-visible reply is
//! complete once delivery is attempted; every persistence step runs detached
//! and is allowed to fail.

pub mod context;
pub mod prompt;
pub mod transcript;
pub mod trigger;

use crate::db::{Database, GroupConfig};
use crate::llm::{GeminiClient, TurnRole};
use crate::telegram::{BotIdentity, Message, TelegramApi, Update};
use context::fetch_context;
use prompt::{compose_system_prompt, resolve_role};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use transcript::build_transcript;

/// Reply used when no Gemini key is configured.
pub const OFFLINE_NOTICE: &str = "⚠️ AI core offline. No GEMINI_API_KEY configured.";

const START_GREETING: &str = "Add me in your group with full admin rights then see MAGIC.";

pub struct Bot {
    pub telegram: TelegramApi,
    pub gemini: Option<GeminiClient>,
    pub db: Option<Arc<Database>>,
    pub identity: BotIdentity,
    pub owner_id: i64,
    /// Detached persistence tasks land here so they are tracked, not leaked.
    pub tasks: TaskTracker,
}

impl Bot {
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };

        if message.is_private() {
            self.handle_private(&message).await;
            return;
        }

        self.handle_group_message(message).await;
    }

    /// Private chats get the onboarding greeting on /start and nothing else;
    /// the moderation pipeline never runs here.
    async fn handle_private(&self, message: &Message) {
        let Some(text) = message.text_or_caption() else {
            return;
        };
        if !text.starts_with("/start") {
            return;
        }

        let bot_username = self.identity.username.as_deref().unwrap_or_default();
        let markup = serde_json::json!({
            "inline_keyboard": [[{
                "text": "➕ ADD TO GROUP",
                "url": format!("https://t.me/{bot_username}?startgroup=true"),
            }]]
        });

        if let Err(e) = self
            .telegram
            .send_message_with_markup(message.chat.id, START_GREETING, markup)
            .await
        {
            tracing::warn!("greeting delivery failed: {e}");
        }
    }

    async fn handle_group_message(&self, message: Message) {
        // GATE
        if !trigger::should_respond(&message, self.identity.id) {
            return;
        }
        let Some(user) = message.from.clone() else {
            return;
        };
        let Some(text) = message.text_or_caption().map(str::to_string) else {
            return;
        };
        let group_id = message.chat.id;

        // FETCH_GROUP_USER_STATE — the opt-out lookup is awaited so the gate
        // is correct; record creation is not.
        if let Some(db) = &self.db {
            match db.group_config(group_id).await {
                Ok(found) => {
                    if !GroupConfig::allows_auto_reply(found.as_ref()) {
                        tracing::debug!(group_id, "group opted out of auto-replies");
                        return;
                    }
                    if found.is_none() {
                        let db = Arc::clone(db);
                        self.tasks.spawn(async move {
                            if let Err(e) = db.ensure_group(group_id).await {
                                tracing::warn!("group config creation failed: {e}");
                            }
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("group config lookup failed, assuming enabled: {e}");
                }
            }

            if let Err(e) = db.ensure_user(user.id, user.display_name()).await {
                tracing::warn!("user profile upsert failed: {e}");
            }
        }

        // CONTEXT
        let context = fetch_context(self.db.as_deref(), user.id, user.display_name()).await;

        // GENERATE
        if let Err(e) = self.telegram.send_chat_action(group_id, "typing").await {
            tracing::debug!("typing indicator failed: {e}");
        }

        let turns = build_transcript(&context.history, &text);
        let role = resolve_role(user.id, self.owner_id);
        let system_prompt = compose_system_prompt(&context.persona, &context.user, role);

        let reply = match &self.gemini {
            None => OFFLINE_NOTICE.to_string(),
            Some(gemini) => match gemini.generate(&system_prompt, &turns).await {
                Ok(generated) => generated,
                // Surfaced verbatim on purpose: operators debug from the chat.
                Err(e) => format!("⚠️ AI core failure: {e}"),
            },
        };

        // DELIVER — failure is logged only; persistence still proceeds.
        if let Err(e) = self
            .telegram
            .send_message(group_id, &reply, Some(message.message_id))
            .await
        {
            tracing::error!("reply delivery failed: {e}");
        }

        // PERSIST
        if let Some(db) = &self.db {
            self.persist_exchange(db, user.id, group_id, text, reply);
        }
    }

    /// Four independent detached writes: inbound turn, outbound turn,
    /// retention sweep, usage log. None of them may delay or fail the
    /// already-delivered reply.
    fn persist_exchange(
        &self,
        db: &Arc<Database>,
        user_id: i64,
        group_id: i64,
        inbound: String,
        outbound: String,
    ) {
        let log_details = serde_json::json!({
            "user_id": user_id,
            "group_id": group_id,
            "message": inbound,
        });

        {
            let db = Arc::clone(db);
            let content = inbound;
            self.tasks.spawn(async move {
                if let Err(e) = db.store_turn(user_id, TurnRole::User, &content).await {
                    tracing::warn!("failed to store inbound turn: {e}");
                }
            });
        }
        {
            let db = Arc::clone(db);
            self.tasks.spawn(async move {
                if let Err(e) = db.store_turn(user_id, TurnRole::Model, &outbound).await {
                    tracing::warn!("failed to store model turn: {e}");
                }
            });
        }
        {
            let db = Arc::clone(db);
            self.tasks.spawn(async move {
                if let Err(e) = db.prune_history(user_id).await {
                    tracing::warn!("retention sweep failed: {e}");
                }
            });
        }
        {
            let db = Arc::clone(db);
            self.tasks.spawn(async move {
                if let Err(e) = db.log_event("ai_reply", log_details).await {
                    tracing::warn!("usage log append failed: {e}");
                }
            });
        }
    }
}
