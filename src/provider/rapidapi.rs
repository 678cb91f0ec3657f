//! RapidAPI `youtube-mp36` provider
//!
//! One GET per call: `https://{host}/dl?id={video_id}` with the RapidAPI
//! credentials in headers. No retries and no client-side timeout beyond the
//! HTTP client defaults.

use super::{AudioMetadata, AudioProvider, AudioStatus, ProviderError};
use crate::config::Settings;
use crate::extractor::VideoId;
use crate::utils::truncate_str;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument, warn};

/// Status value the provider uses for a finished conversion
const READY_STATUS: &str = "ok";

/// Provider client for the RapidAPI YouTube-to-MP3 service
#[derive(Clone)]
pub struct RapidApiProvider {
    client: HttpClient,
    api_key: String,
    api_host: String,
    base_url: String,
}

impl RapidApiProvider {
    /// Create a provider from the application settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: HttpClient::new(),
            api_key: settings.rapidapi_key.clone(),
            api_host: settings.rapidapi_host.clone(),
            base_url: format!("https://{}", settings.rapidapi_host),
        }
    }

    /// Point the provider at a different base URL (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AudioProvider for RapidApiProvider {
    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<AudioMetadata, ProviderError> {
        let url = format!("{}/dl", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[("id", video_id.as_str())])
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %truncate_str(&body, 300),
                "Provider returned non-success status"
            );
            return Err(ProviderError::TransportFailure {
                status: status.as_u16(),
            });
        }

        let payload: DlResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidPayload(e.without_url().to_string()))?;

        payload.into_metadata()
    }
}

/// Response body of the `/dl` endpoint
#[derive(Debug, Default, Deserialize)]
struct DlResponse {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    duration: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl DlResponse {
    fn into_metadata(self) -> Result<AudioMetadata, ProviderError> {
        let provider_status = self.status.unwrap_or_default();
        let link = self.link.filter(|link| !link.trim().is_empty());

        let link = match link {
            Some(link) if provider_status == READY_STATUS => link,
            _ => {
                debug!(
                    provider_status = %provider_status,
                    msg = ?self.msg,
                    "Provider has no downloadable audio yet"
                );
                return Err(ProviderError::ExtractionNotReady { provider_status });
            }
        };

        Ok(AudioMetadata {
            link,
            title: self.title.unwrap_or_default(),
            size_bytes: self.filesize,
            duration_secs: self.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
            status: AudioStatus::from_provider(&provider_status),
        })
    }
}

/// Accept numbers, numeric strings and `null`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64))
}
