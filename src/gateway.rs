//! Axum webhook gateway.
//!
//! Telegram delivers each `Update` as a JSON POST to the root path. The
//! handler acknowledges immediately and detaches the pipeline onto the bot's
//! task tracker, so a slow model or persistence layer never delays the
//! transport-level receipt (Telegram retries non-2xx deliveries).

use crate::pipeline::Bot;
use crate::telegram::Update;
use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) — prevents slow-loris attacks
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
}

pub fn router(bot: Arc<Bot>) -> Router {
    Router::new()
        .route("/", post(handle_update))
        .route("/health", get(handle_health))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .with_state(AppState { bot })
}

/// GET /health — liveness plus which optional collaborators are wired up.
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "ai": state.bot.gemini.is_some(),
        "persistence": state.bot.db.is_some(),
    }))
}

/// POST / — webhook root. Always acknowledged; the pipeline runs detached.
async fn handle_update(
    State(state): State<AppState>,
    body: Result<Json<Update>, JsonRejection>,
) -> StatusCode {
    match body {
        Ok(Json(update)) => {
            let bot = Arc::clone(&state.bot);
            state
                .bot
                .tasks
                .spawn(async move { bot.handle_update(update).await });
        }
        // Acknowledge anyway so Telegram does not redeliver garbage forever.
        Err(e) => tracing::warn!("discarding malformed update: {e}"),
    }
    StatusCode::OK
}

pub async fn serve(bot: Arc<Bot>, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("webhook gateway listening on {addr}");
    axum::serve(listener, router(bot)).await?;
    Ok(())
}
