//! Webhook HTTP endpoint.
//!
//! Telegram delivers updates as JSON `POST`s to `/webhook/{path_secret}` and
//! echoes the configured secret in `X-Telegram-Bot-Api-Secret-Token`. The
//! handler authenticates, queues the work item and answers right away; the
//! reply is produced later by the dispatcher.

use super::inbound::{inbound_from_update, Inbound};
use crate::config::{Settings, TELEGRAM_SECRET_HEADER};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use teloxide::types::Update;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

/// Shared state of the webhook handler
#[derive(Clone)]
pub struct WebhookState {
    secret_token: Arc<str>,
    bot_username: Arc<str>,
    queue: UnboundedSender<Inbound>,
}

impl WebhookState {
    /// Create handler state that pushes work onto `queue`.
    ///
    /// `bot_username` is used to match `/command@bot` forms; pass an empty
    /// string when it is unknown.
    pub fn new(
        secret_token: impl Into<Arc<str>>,
        bot_username: impl Into<Arc<str>>,
        queue: UnboundedSender<Inbound>,
    ) -> Self {
        Self {
            secret_token: secret_token.into(),
            bot_username: bot_username.into(),
            queue,
        }
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(TELEGRAM_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|token| constant_time_eq(token, &self.secret_token))
    }
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Webhook request failures surfaced as HTTP statuses
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Secret header missing or wrong
    #[error("missing or mismatched webhook secret token")]
    Unauthorized,
    /// The dispatcher is gone, so nothing can be processed
    #[error("processing queue is closed")]
    QueueClosed,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

/// Build the HTTP router: the secret webhook route plus health checks.
pub fn router(
    settings: &Settings,
    bot_username: &str,
    queue: UnboundedSender<Inbound>,
) -> Router {
    let state = WebhookState::new(settings.webhook_secret_token.as_str(), bot_username, queue);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(&settings.webhook_path(), post(receive_update))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    if !state.is_authorized(&headers) {
        warn!("Rejected webhook call with a bad secret token");
        return Err(WebhookError::Unauthorized);
    }

    // Telegram retries anything that is not a 2xx, so bad payloads are acknowledged.
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Dropping unparseable update");
            return Ok(StatusCode::OK);
        }
    };

    let Some(inbound) = inbound_from_update(&update, &state.bot_username) else {
        debug!(update_id = update.id.0, "Ignoring irrelevant update");
        return Ok(StatusCode::OK);
    };

    debug!(
        update_id = update.id.0,
        chat_id = inbound.target().0,
        "Queued update"
    );
    state.queue.send(inbound).map_err(|_| {
        error!("Processing queue is closed, update not accepted");
        WebhookError::QueueClosed
    })?;

    Ok(StatusCode::OK)
}
