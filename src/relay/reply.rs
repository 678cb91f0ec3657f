//! Outbound reply model and the user-facing texts.

use crate::config::{AUDIO_PERFORMER, DEFAULT_AUDIO_TITLE};
use crate::provider::AudioMetadata;

/// Reply for a message without a recognizable video link
pub const NO_LINK_TEXT: &str = "🔗 Please send a valid YouTube link.";

/// Reply when the provider could not deliver the audio
pub const FETCH_FAILED_TEXT: &str =
    "😔 Could not retrieve the audio. Please try again later or use another link.";

/// Reply when the audio exceeds the size limit
pub const TOO_LARGE_TEXT: &str = "📦 The file is too large to send. Please try a shorter video.";

/// Reply to `/start` and `/help`
pub const HELP_TEXT: &str = "👋 Send me a YouTube link (watch, youtu.be, shorts or live) \
and I will reply with the audio track.";

/// Audio attachment addressed back to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioReply {
    /// Download URL Telegram fetches the file from
    pub link: String,
    /// Track title shown by the player
    pub title: String,
    /// Performer label shown by the player
    pub performer: String,
    /// Duration in whole seconds, if known
    pub duration: Option<u32>,
    /// Optional caption under the audio
    pub caption: Option<String>,
}

impl AudioReply {
    /// Build the audio reply for ready metadata.
    #[must_use]
    pub fn from_metadata(meta: &AudioMetadata) -> Self {
        let title = meta.title.trim();
        Self {
            link: meta.link.clone(),
            title: if title.is_empty() {
                DEFAULT_AUDIO_TITLE.to_string()
            } else {
                title.to_string()
            },
            performer: AUDIO_PERFORMER.to_string(),
            duration: rounded_duration(meta.duration_secs),
            caption: (!title.is_empty()).then(|| format!("🎵 {title}")),
        }
    }
}

/// Reply produced for one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text message
    Text(String),
    /// Audio attachment
    Audio(AudioReply),
}

impl Reply {
    /// Text reply helper.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_duration(secs: f64) -> Option<u32> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    let rounded = secs.round();
    (rounded >= 1.0).then(|| rounded.min(f64::from(u32::MAX)) as u32)
}
