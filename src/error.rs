use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the bot.
///
/// Each collaborator defines its own error variant. Library callers can match
/// on these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum BotError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Persistence ─────────────────────────────────────────────────────
    #[error("db: {0}")]
    Db(#[from] DbError),

    // ── Language model ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Telegram transport ──────────────────────────────────────────────
    #[error("telegram: {0}")]
    Telegram(#[from] TelegramError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TERMINATOR_BOT_TOKEN is not set — refusing to start")]
    MissingBotToken,

    #[error("RENDER_EXTERNAL_HOSTNAME is not set — webhook registration impossible")]
    MissingHostname,

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

// ─── Persistence errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DbError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("supabase returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

// ─── Language-model errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("no response candidates from Gemini")]
    EmptyResponse,
}

// ─── Telegram errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram {method} failed ({status}): {body}")]
    Api {
        method: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}
