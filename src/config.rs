//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the relay's fixed limits.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest audio file the bot will relay (Telegram bots upload at most 50 MB).
pub const MAX_AUDIO_SIZE_BYTES: u64 = 49 * 1024 * 1024;

/// Performer label attached to every relayed audio
pub const AUDIO_PERFORMER: &str = "YouTube Audio Bot";

/// Title used when the provider reports none
pub const DEFAULT_AUDIO_TITLE: &str = "Audio";

/// Default RapidAPI host of the extraction provider
pub const DEFAULT_RAPIDAPI_HOST: &str = "youtube-mp36.p.rapidapi.com";

/// Header Telegram uses to echo the webhook secret token
pub const TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Application settings loaded from environment variables
#[derive(Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,
    /// Secret path segment of the webhook route (`/webhook/{secret}`)
    pub webhook_path_secret: String,
    /// Shared secret Telegram sends in `X-Telegram-Bot-Api-Secret-Token`
    pub webhook_secret_token: String,
    /// RapidAPI key for the extraction provider
    pub rapidapi_key: String,

    /// RapidAPI host of the extraction provider
    #[serde(default = "default_rapidapi_host")]
    pub rapidapi_host: String,
    /// Address the webhook server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Port the webhook server listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL; when set the webhook is registered with Telegram on startup
    pub public_url: Option<String>,
}

fn default_rapidapi_host() -> String {
    DEFAULT_RAPIDAPI_HOST.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            webhook_path_secret: String::new(),
            webhook_secret_token: String::new(),
            rapidapi_key: String::new(),
            rapidapi_host: default_rapidapi_host(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            public_url: None,
        }
    }
}

// Secrets never reach the logs through `{:?}`.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("telegram_token", &"[redacted]")
            .field("webhook_path_secret", &"[redacted]")
            .field("webhook_secret_token", &"[redacted]")
            .field("rapidapi_key", &"[redacted]")
            .field("rapidapi_host", &self.rapidapi_host)
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("public_url", &self.public_url)
            .finish()
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use oxide_audio_relay::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required secret is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            // Eg.. `APP__PORT=9000 ./target/app` would set the `port` key
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        Self::from_config(s)
    }

    /// Deserialize and validate settings from an already built `Config`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if deserialization fails or a required secret
    /// is missing or blank.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        settings.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let required = [
            ("TELEGRAM_TOKEN", &self.telegram_token),
            ("WEBHOOK_PATH_SECRET", &self.webhook_path_secret),
            ("WEBHOOK_SECRET_TOKEN", &self.webhook_secret_token),
            ("RAPIDAPI_KEY", &self.rapidapi_key),
        ];

        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Message(format!("{name} must be set")));
        }

        let is_path_safe = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if !self.webhook_path_secret.chars().all(is_path_safe) {
            return Err(ConfigError::Message(
                "WEBHOOK_PATH_SECRET may only contain A-Z, a-z, 0-9, '_' and '-'".to_string(),
            ));
        }

        Ok(self)
    }

    /// Route path the webhook is served on.
    #[must_use]
    pub fn webhook_path(&self) -> String {
        format!("/webhook/{}", self.webhook_path_secret)
    }

    /// Full public webhook URL, if a public base URL is configured.
    #[must_use]
    pub fn webhook_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .map(|base| format!("{}{}", base.trim_end_matches('/'), self.webhook_path()))
    }

    /// Socket address string for the webhook server.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder()
            .set_override("telegram_token", "123456:ABC")
            .and_then(|b| b.set_override("webhook_path_secret", "hook"))
            .and_then(|b| b.set_override("webhook_secret_token", "s3cr3t"))
            .and_then(|b| b.set_override("rapidapi_key", "key"))
            .expect("valid overrides")
    }

    #[test]
    fn test_loads_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let settings = Settings::from_config(base_builder().build()?)?;

        assert_eq!(settings.rapidapi_host, DEFAULT_RAPIDAPI_HOST);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.listen_addr(), "0.0.0.0:8080");
        assert_eq!(settings.webhook_path(), "/webhook/hook");
        assert_eq!(settings.webhook_url(), None);
        Ok(())
    }

    #[test]
    fn test_missing_secret_refuses() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::builder()
            .set_override("telegram_token", "123456:ABC")?
            .set_override("webhook_path_secret", "hook")?
            .set_override("webhook_secret_token", "s3cr3t")?
            .build()?;

        assert!(Settings::from_config(config).is_err());
        Ok(())
    }

    #[test]
    fn test_blank_secret_refuses() -> Result<(), Box<dyn std::error::Error>> {
        let config = base_builder().set_override("rapidapi_key", "   ")?.build()?;

        let err = Settings::from_config(config).expect_err("blank key must fail");
        assert!(err.to_string().contains("RAPIDAPI_KEY"));
        Ok(())
    }

    #[test]
    fn test_path_secret_must_be_single_segment() -> Result<(), Box<dyn std::error::Error>> {
        let config = base_builder()
            .set_override("webhook_path_secret", "a/b")?
            .build()?;

        assert!(Settings::from_config(config).is_err());
        Ok(())
    }

    #[test]
    fn test_webhook_url_and_port_string() -> Result<(), Box<dyn std::error::Error>> {
        let config = base_builder()
            .set_override("public_url", "https://bot.example.com/")?
            .set_override("port", "9000")?
            .build()?;

        let settings = Settings::from_config(config)?;
        assert_eq!(
            settings.webhook_url().as_deref(),
            Some("https://bot.example.com/webhook/hook")
        );
        assert_eq!(settings.port, 9000);
        Ok(())
    }

    #[test]
    fn test_debug_redacts_secrets() -> Result<(), Box<dyn std::error::Error>> {
        let settings = Settings::from_config(base_builder().build()?)?;
        let rendered = format!("{settings:?}");

        assert!(!rendered.contains("123456:ABC"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("[redacted]"));
        Ok(())
    }
}
