use anyhow::Result;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use terminator::db::Database;
use terminator::llm::GeminiClient;
use terminator::pipeline::Bot;
use terminator::telegram::TelegramApi;
use terminator::{Config, gateway};

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::from_env()?;

    let telegram = TelegramApi::new(config.bot_token.clone());
    let identity = telegram.get_me().await?;
    tracing::info!(
        bot_id = identity.id,
        username = identity.username.as_deref().unwrap_or("?"),
        "Telegram identity resolved"
    );

    let gemini = match config.gemini_api_key.clone() {
        Some(key) => Some(GeminiClient::new(key)),
        None => {
            tracing::warn!("GEMINI_API_KEY missing — AI replies disabled");
            None
        }
    };

    let db = match config.supabase() {
        Some((url, key)) => {
            tracing::info!("Supabase connected");
            Some(Arc::new(Database::new(url, key)))
        }
        None => {
            tracing::warn!("Supabase credentials missing. Limited mode.");
            None
        }
    };

    telegram.set_webhook(&config.webhook_url()).await?;
    tracing::info!(url = %config.webhook_url(), "webhook registered");

    let bot = Arc::new(Bot {
        telegram,
        gemini,
        db,
        identity,
        owner_id: config.owner_id,
        tasks: TaskTracker::new(),
    });

    tracing::info!(port = config.port, "TERMINATOR online (webhook mode)");
    gateway::serve(bot, config.port).await
}
