//! Logging setup with secret redaction.
//!
//! Every formatted log line passes through [`RedactionPatterns`] before it
//! reaches stderr, so bot tokens and API keys never end up in logs even when
//! they appear inside a library error message.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    rapidapi_key: Regex,
    secret_token: Regex,
    webhook_path: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            rapidapi_key: Regex::new(r#"(?i)(x-rapidapi-key["']?\s*[:=]\s*["']?)[A-Za-z0-9_-]+"#)?,
            secret_token: Regex::new(
                r#"(?i)(x-telegram-bot-api-secret-token["']?\s*[:=]\s*["']?)[A-Za-z0-9_-]+"#,
            )?,
            webhook_path: Regex::new(r"(/webhook/)[A-Za-z0-9_-]+")?,
        })
    }

    /// Mask every secret occurrence in `input`.
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .rapidapi_key
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .secret_token
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .webhook_path
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted output may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug_mode` selects between a verbose
/// filter and the production one.
pub fn init_logging(patterns: Arc<RedactionPatterns>, debug_mode: bool) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "oxide_audio_relay=info,teloxide=warn,hyper=warn,h2=error,reqwest=warn,tokio=warn,tower=warn,axum=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
