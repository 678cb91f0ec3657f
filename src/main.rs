use dotenvy::dotenv;
use oxide_audio_relay::config::Settings;
use oxide_audio_relay::logging::{init_logging, RedactionPatterns};
use oxide_audio_relay::runner::run_bot;
use oxide_audio_relay::utils::is_truthy;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    let debug_mode = std::env::var("DEBUG_MODE").is_ok_and(|v| is_truthy(&v));
    init_logging(patterns, debug_mode);

    info!("Starting Oxide Audio Relay...");

    let settings = init_settings();

    if let Err(e) = run_bot(settings).await {
        error!("Bot terminated with error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}
