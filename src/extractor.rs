//! Video identifier extraction from free-form chat text.
//!
//! Recognizes the usual YouTube link shapes (`watch?v=`, `youtu.be/`, `/shorts/`,
//! `/live/`) and falls back to scanning the raw text for an embedded
//! 11-character identifier.

use lazy_regex::lazy_regex;
use std::fmt;
use url::Url;

/// Host used by YouTube short links (`https://youtu.be/<id>`)
const SHORT_LINK_HOST: &str = "youtu.be";

/// Canonical video-site domain; subdomains (`www.`, `m.`, `music.`) are accepted
const VIDEO_SITE_DOMAIN: &str = "youtube.com";

/// Path of the classic watch page
const WATCH_PATH: &str = "/watch";

/// Fixed length of a YouTube video identifier
pub const VIDEO_ID_LEN: usize = 11;

static RE_SHORTS_OR_LIVE: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"^/(?:shorts|live)/([A-Za-z0-9_-]{6,})");

// Over-matches: any URL with an 11-char segment after `/` qualifies, whatever the host.
static RE_EMBEDDED_ID: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?:v=|/)([A-Za-z0-9_-]{11})(?:[?&/]|$)");

/// A video identifier as found in user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap a raw identifier without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier has the provider's fixed length and alphabet.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.0.len() == VIDEO_ID_LEN && self.0.chars().all(is_id_char)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Extract a video identifier from free-form text.
///
/// Tries structured URL rules first and then the raw-text fallback scan.
/// Returns `None` for empty input or when nothing resembling an identifier is
/// found. Never panics on malformed input.
///
/// # Examples
///
/// ```
/// use oxide_audio_relay::extractor::extract_video_id;
///
/// let id = extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc");
/// assert_eq!(id.as_ref().map(|id| id.as_str()), Some("dQw4w9WgXcQ"));
/// assert!(extract_video_id("   ").is_none());
/// ```
#[must_use]
pub fn extract_video_id(text: &str) -> Option<VideoId> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(trimmed) {
        if let Some(found) = from_url(&url) {
            return found;
        }
    }

    // Trimmed so a trailing newline still counts as end of text.
    scan_embedded_id(trimmed)
}

/// Apply host/path rules to a parsed URL.
///
/// The outer `None` means "no rule matched, try the fallback scan"; an inner
/// `None` is a final answer.
fn from_url(url: &Url) -> Option<Option<VideoId>> {
    let host = url.host_str()?;

    if host == SHORT_LINK_HOST {
        let id = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .map(VideoId::new);
        return Some(id);
    }

    if host.ends_with(VIDEO_SITE_DOMAIN) {
        let path = url.path();
        if path == WATCH_PATH {
            let id = url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| VideoId::new(value.into_owned()));
            return Some(id);
        }

        if let Some(caps) = RE_SHORTS_OR_LIVE.captures(path) {
            return Some(caps.get(1).map(|m| VideoId::new(m.as_str())));
        }
    }

    None
}

fn scan_embedded_id(text: &str) -> Option<VideoId> {
    RE_EMBEDDED_ID
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId::new(m.as_str()))
}
