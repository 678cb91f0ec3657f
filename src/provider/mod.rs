//! Audio extraction providers
//!
//! A provider turns a video identifier into a downloadable audio link plus
//! whatever metadata the service reports about it.

mod rapidapi;

pub use rapidapi::RapidApiProvider;

use crate::extractor::VideoId;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by an audio provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status
    #[error("provider returned HTTP {status}")]
    TransportFailure {
        /// HTTP status code
        status: u16,
    },
    /// The provider answered, but the audio is not ready or has no link
    #[error("extraction not ready (provider status: {provider_status})")]
    ExtractionNotReady {
        /// Raw `status` field reported by the provider
        provider_status: String,
    },
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be decoded
    #[error("invalid provider payload: {0}")]
    InvalidPayload(String),
}

/// Conversion state reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    /// Audio is converted and downloadable
    Ready,
    /// Conversion is still in progress
    Pending,
    /// Conversion failed or the status is unknown
    Failed,
}

impl AudioStatus {
    /// Map the provider's `status` string.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "ok" => Self::Ready,
            "processing" => Self::Pending,
            _ => Self::Failed,
        }
    }
}

/// Metadata describing a converted audio file
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    /// Direct download link
    pub link: String,
    /// Track title, empty when the provider did not report one
    pub title: String,
    /// File size in bytes, if reported
    pub size_bytes: Option<u64>,
    /// Duration in seconds, zero when unknown
    pub duration_secs: f64,
    /// Conversion state
    pub status: AudioStatus,
}

/// Interface for audio extraction providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioProvider: Send + Sync {
    /// Fetch audio metadata for a video. Issues exactly one request.
    async fn fetch(&self, video_id: &VideoId) -> Result<AudioMetadata, ProviderError>;
}
