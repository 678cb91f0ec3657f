use crate::config::Settings;
use crate::provider::RapidApiProvider;
use crate::relay::Relay;
use crate::telegram::{router, run_dispatcher, TelegramTransport};
use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use url::Url;

/// Run the webhook server and the message dispatcher until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let bot = Bot::new(settings.telegram_token.clone());
    register_webhook(&bot, &settings).await;
    let bot_username = resolve_username(&bot).await;

    let provider = Arc::new(RapidApiProvider::new(&settings));
    info!(host = %settings.rapidapi_host, "Audio provider initialized.");

    let transport = Arc::new(TelegramTransport::new(bot));
    let relay = Arc::new(Relay::new(provider, transport));

    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = tokio::spawn(run_dispatcher(relay, rx));
    let app = router(&settings, &bot_username, tx);

    let addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind webhook server to {addr}"))?;

    info!("Bot is running, webhook server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server error")?;

    // The router owned the last queue sender; the dispatcher now drains and exits.
    if let Err(e) = dispatcher.await {
        error!("Dispatcher task failed: {}", e);
    }

    info!("Bot stopped.");
    Ok(())
}

async fn register_webhook(bot: &Bot, settings: &Settings) {
    let Some(webhook_url) = settings.webhook_url() else {
        info!("PUBLIC_URL not set, assuming the webhook is registered externally.");
        return;
    };

    let url = match Url::parse(&webhook_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("PUBLIC_URL does not form a valid webhook URL: {}", e);
            return;
        }
    };

    match bot
        .set_webhook(url)
        .secret_token(settings.webhook_secret_token.clone())
        .allowed_updates([AllowedUpdate::Message, AllowedUpdate::ChannelPost])
        .await
    {
        Ok(_) => info!("Webhook registered with Telegram."),
        Err(e) => warn!("Failed to register webhook, continuing: {}", e),
    }
}

async fn resolve_username(bot: &Bot) -> String {
    match bot.get_me().await {
        Ok(me) => {
            let username = me.user.username.clone().unwrap_or_default();
            info!("Running as @{}", username);
            username
        }
        Err(e) => {
            warn!("Failed to resolve bot username, /command@bot forms will not match: {}", e);
            String::new()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping webhook server...");
}
