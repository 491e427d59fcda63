use crate::llm::TurnRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored utterance in a user's private memory stream. Immutable once
/// written; reaped by the retention sweep after seven days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_id: i64,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Singleton bot voice configuration, externally administered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_aggression")]
    pub aggression_level: u8,
    #[serde(default = "default_style")]
    pub response_style: String,
    #[serde(default)]
    pub custom_phrases: Vec<String>,
}

fn default_tone() -> String {
    "cold".to_string()
}

fn default_aggression() -> u8 {
    5
}

fn default_style() -> String {
    "military".to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            tone: default_tone(),
            aggression_level: default_aggression(),
            response_style: default_style(),
            custom_phrases: Vec::new(),
        }
    }
}

/// Per-user risk metadata. Risk score is raised and lowered externally; this
/// core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "active".to_string()
}

impl UserProfile {
    /// Profile used when no record exists or persistence is unreachable.
    pub fn placeholder(user_id: i64, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            risk_score: 0.0,
            status: default_status(),
        }
    }
}

/// Per-group auto-reply gate. `ai_mode` is a nullable flag column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub group_id: i64,
    #[serde(default)]
    pub ai_mode: Option<i64>,
}

/// Flag value that opts a group out of auto-replies.
pub const AI_MODE_DISABLED: i64 = 0;

impl GroupConfig {
    /// Tri-state gate: no record means enabled, a record with
    /// `ai_mode == 0` means disabled, a record with any other value (or a
    /// null flag) means enabled.
    pub fn allows_auto_reply(found: Option<&GroupConfig>) -> bool {
        !matches!(
            found,
            Some(GroupConfig {
                ai_mode: Some(AI_MODE_DISABLED),
                ..
            })
        )
    }
}
