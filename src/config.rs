use crate::error::ConfigError;

/// Default listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 10_000;

/// Environment-variable configuration surface.
///
/// Two values are fatal when missing (bot token, public hostname); everything
/// else degrades: no Gemini key means AI replies report offline, missing
/// Supabase credentials mean the bot runs stateless with no memory.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub gemini_api_key: Option<String>,
    pub owner_id: i64,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub external_hostname: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Values are trimmed; empty
    /// strings count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = read("TERMINATOR_BOT_TOKEN").ok_or(ConfigError::MissingBotToken)?;
        let external_hostname =
            read("RENDER_EXTERNAL_HOSTNAME").ok_or(ConfigError::MissingHostname)?;

        let owner_id = match read("TERMINATOR_OWNER_ID") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "TERMINATOR_OWNER_ID",
                value: raw,
            })?,
            None => 0,
        };

        let port = match read("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            gemini_api_key: read("GEMINI_API_KEY"),
            owner_id,
            supabase_url: read("SUPABASE_URL"),
            supabase_key: read("SUPABASE_KEY"),
            external_hostname,
            port,
        })
    }

    /// Supabase credentials, present only when both halves are configured.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (self.supabase_url.as_deref(), self.supabase_key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }

    /// Public webhook URL registered with Telegram (root path only).
    pub fn webhook_url(&self) -> String {
        format!("https://{}/", self.external_hostname)
    }
}
