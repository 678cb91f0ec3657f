#![deny(missing_docs)]
//! Oxide Audio Relay
//!
//! A Telegram bot that answers YouTube links with the audio track. Updates
//! arrive over an authenticated webhook, the audio is resolved through a
//! RapidAPI extraction service and Telegram fetches the file from the
//! returned link.

/// Configuration management
pub mod config;
/// Video identifier extraction from free text
pub mod extractor;
/// Logging setup with secret redaction
pub mod logging;
/// Audio metadata providers
pub mod provider;
/// Per-message orchestration
pub mod relay;
/// Process runtime: webhook server and dispatcher
pub mod runner;
/// Telegram adapter
pub mod telegram;
/// Text helpers
pub mod utils;
