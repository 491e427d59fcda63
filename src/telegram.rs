//! Telegram Bot API collaborator: outbound calls plus the inbound webhook
//! `Update` envelope types.

use crate::error::TelegramError;
use crate::http::build_client;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 15;

// ─── Inbound update envelope ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    /// Message text, falling back to the caption for non-text content.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn is_private(&self) -> bool {
        self.chat.kind == "private"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl User {
    /// Display identity stored in the user profile on first contact.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.first_name.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The bot's own identity, from `getMe`. The reply trigger compares against
/// the exact numeric id, never "any bot".
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

// ─── Outbound client ─────────────────────────────────────────────────────────

pub struct TelegramApi {
    bot_token: String,
    base_url: String,
    client: Client,
}

impl TelegramApi {
    pub fn new(bot_token: String) -> Self {
        Self::with_base_url(bot_token, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at an alternate endpoint (used by tests).
    pub fn with_base_url(bot_token: String, base_url: String) -> Self {
        Self {
            bot_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(REQUEST_TIMEOUT_SECS),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.bot_token)
    }

    async fn call(&self, method: &'static str, body: &Value) -> Result<Value, TelegramError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::Api {
                method,
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Resolve the bot's own identity at startup.
    pub async fn get_me(&self) -> Result<BotIdentity, TelegramError> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::Api {
                method: "getMe",
                status,
                body,
            });
        }

        let parsed: ApiResponse<BotIdentity> = response.json().await?;
        parsed.result.filter(|_| parsed.ok).ok_or_else(|| {
            TelegramError::Api {
                method: "getMe",
                status: reqwest::StatusCode::OK,
                body: parsed.description.unwrap_or_default(),
            }
        })
    }

    /// Send a text reply quoting the triggering message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_to_message_id"] = message_id.into();
            body["allow_sending_without_reply"] = true.into();
        }

        self.call("sendMessage", &body).await?;
        Ok(())
    }

    /// Send a message with an inline keyboard (the private /start greeting).
    pub async fn send_message_with_markup(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Value,
    ) -> Result<(), TelegramError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": reply_markup,
        });

        self.call("sendMessage", &body).await?;
        Ok(())
    }

    /// Best-effort typing indicator before generation.
    pub async fn send_chat_action(
        &self,
        chat_id: i64,
        action: &str,
    ) -> Result<(), TelegramError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "action": action,
        });

        self.call("sendChatAction", &body).await?;
        Ok(())
    }

    /// Register the public webhook URL, dropping any backlog.
    pub async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        let body = serde_json::json!({
            "url": url,
            "drop_pending_updates": true,
            "allowed_updates": ["message"],
        });

        self.call("setWebhook", &body).await?;
        Ok(())
    }
}
