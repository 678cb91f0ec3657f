//! Message orchestration: link → identifier → provider → size check → reply.
//!
//! Every inbound message runs through the same state machine. The only
//! per-source difference is what happens when no link is found: direct
//! messages get a hint, group messages and channel posts are dropped silently.

mod reply;

pub use reply::{
    AudioReply, Reply, FETCH_FAILED_TEXT, HELP_TEXT, NO_LINK_TEXT, TOO_LARGE_TEXT,
};

use crate::config::MAX_AUDIO_SIZE_BYTES;
use crate::extractor::extract_video_id;
use crate::provider::{AudioProvider, AudioStatus, ProviderError};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Opaque handle identifying the chat a reply goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyTarget(pub i64);

/// Where an inbound message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    /// One-to-one message addressed to the bot
    Direct,
    /// Message in a group or supergroup the bot is a member of
    Group,
    /// Post in a channel the bot is a member of
    ChannelPost,
}

/// What to do with a message that carries no video link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoLinkPolicy {
    /// Answer with a hint
    Reply,
    /// Stay silent
    SilentDrop,
}

impl MessageSource {
    /// Policy applied when extraction finds nothing.
    #[must_use]
    pub const fn no_link_policy(self) -> NoLinkPolicy {
        match self {
            Self::Direct => NoLinkPolicy::Reply,
            Self::Group | Self::ChannelPost => NoLinkPolicy::SilentDrop,
        }
    }
}

/// A chat message handed over by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message text (or caption); may be empty
    pub text: String,
    /// Chat to answer in
    pub target: ReplyTarget,
    /// Entry point the message arrived through
    pub source: MessageSource,
}

impl InboundMessage {
    /// Create an inbound message.
    #[must_use]
    pub fn new(text: impl Into<String>, target: ReplyTarget, source: MessageSource) -> Self {
        Self {
            text: text.into(),
            target,
            source,
        }
    }
}

/// Reasons a message does not end in an audio reply
#[derive(Debug, Error)]
pub enum RelayError {
    /// The text holds no usable video identifier
    #[error("no video identifier found")]
    NoIdentifierFound,
    /// The provider could not deliver
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The audio is ready but too large to relay
    #[error("audio is {size} bytes, limit is {limit}")]
    PolicyRejection {
        /// Reported size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
}

/// Outbound side of the chat transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Show a "working" indicator in the chat. Best effort.
    async fn indicate_working(&self, target: ReplyTarget) -> anyhow::Result<()>;

    /// Deliver a reply to the chat.
    async fn deliver(&self, target: ReplyTarget, reply: &Reply) -> anyhow::Result<()>;
}

/// Per-message orchestrator. Holds no per-message state.
pub struct Relay {
    provider: Arc<dyn AudioProvider>,
    transport: Arc<dyn ChatTransport>,
    max_audio_bytes: u64,
}

impl Relay {
    /// Create a relay over the given provider and transport.
    #[must_use]
    pub fn new(provider: Arc<dyn AudioProvider>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            provider,
            transport,
            max_audio_bytes: MAX_AUDIO_SIZE_BYTES,
        }
    }

    /// Compute the reply for one message, or `None` when it is dropped.
    ///
    /// Every failure is turned into a user-facing text here; nothing
    /// propagates to the caller.
    #[instrument(skip_all, fields(chat_id = message.target.0, source = ?message.source))]
    pub async fn handle(&self, message: &InboundMessage) -> Option<Reply> {
        match self.resolve(message).await {
            Ok(audio) => {
                info!(title = %audio.title, "Audio ready for relay");
                Some(Reply::Audio(audio))
            }
            Err(RelayError::NoIdentifierFound) => match message.source.no_link_policy() {
                NoLinkPolicy::Reply => Some(Reply::text(NO_LINK_TEXT)),
                NoLinkPolicy::SilentDrop => {
                    debug!("Channel post without a video link, ignoring");
                    None
                }
            },
            Err(e @ RelayError::Provider(_)) => {
                warn!(error = %e, "Provider could not deliver audio");
                Some(Reply::text(FETCH_FAILED_TEXT))
            }
            Err(e @ RelayError::PolicyRejection { .. }) => {
                info!(error = %e, "Audio rejected by size policy");
                Some(Reply::text(TOO_LARGE_TEXT))
            }
        }
    }

    async fn resolve(&self, message: &InboundMessage) -> Result<AudioReply, RelayError> {
        let video_id = extract_video_id(&message.text).ok_or(RelayError::NoIdentifierFound)?;
        debug!(video_id = %video_id, "Extracted video identifier");
        if !video_id.is_canonical() {
            debug!(video_id = %video_id, "Identifier is not canonical, passing it on as-is");
        }

        if let Err(e) = self.transport.indicate_working(message.target).await {
            debug!(error = %e, "Failed to send working indicator");
        }

        let meta = self.provider.fetch(&video_id).await?;
        if meta.status != AudioStatus::Ready {
            return Err(ProviderError::ExtractionNotReady {
                provider_status: format!("{:?}", meta.status).to_lowercase(),
            }
            .into());
        }

        if let Some(size) = meta.size_bytes {
            if size > self.max_audio_bytes {
                return Err(RelayError::PolicyRejection {
                    size,
                    limit: self.max_audio_bytes,
                });
            }
        }

        Ok(AudioReply::from_metadata(&meta))
    }

    /// Handle a message end to end and deliver the reply.
    ///
    /// A panic while computing the reply degrades to the generic failure
    /// text. Delivery errors are logged and swallowed.
    pub async fn process(&self, message: InboundMessage) {
        let reply = match AssertUnwindSafe(self.handle(&message)).catch_unwind().await {
            Ok(reply) => reply,
            Err(_) => {
                error!(chat_id = message.target.0, "Relay pipeline panicked");
                Some(Reply::text(FETCH_FAILED_TEXT))
            }
        };

        if let Some(reply) = reply {
            self.deliver(message.target, &reply).await;
        }
    }

    /// Deliver a reply, logging failures.
    pub async fn deliver(&self, target: ReplyTarget, reply: &Reply) {
        if let Err(e) = self.transport.deliver(target, reply).await {
            error!(chat_id = target.0, error = %e, "Failed to deliver reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::VideoId;
    use crate::provider::{AudioMetadata, MockAudioProvider};
    use mockall::predicate::*;

    const LINK: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn ready(size_bytes: Option<u64>) -> AudioMetadata {
        AudioMetadata {
            link: "https://x/a.mp3".to_string(),
            title: "T".to_string(),
            size_bytes,
            duration_secs: 180.0,
            status: AudioStatus::Ready,
        }
    }

    fn quiet_transport() -> MockChatTransport {
        let mut transport = MockChatTransport::new();
        transport.expect_indicate_working().returning(|_| Ok(()));
        transport
    }

    fn relay(provider: MockAudioProvider, transport: MockChatTransport) -> Relay {
        Relay::new(Arc::new(provider), Arc::new(transport))
    }

    fn direct(text: &str) -> InboundMessage {
        InboundMessage::new(text, ReplyTarget(42), MessageSource::Direct)
    }

    #[tokio::test]
    async fn test_ready_audio_becomes_audio_reply() {
        let mut provider = MockAudioProvider::new();
        provider
            .expect_fetch()
            .with(eq(VideoId::new("dQw4w9WgXcQ")))
            .times(1)
            .returning(|_| Ok(ready(Some(40_000_000))));

        let reply = relay(provider, quiet_transport()).handle(&direct(LINK)).await;

        let Some(Reply::Audio(audio)) = reply else {
            panic!("expected audio reply, got {reply:?}");
        };
        assert_eq!(audio.duration, Some(180));
        assert!(audio.caption.as_deref().is_some_and(|c| c.contains('T')));
        assert_eq!(audio.link, "https://x/a.mp3");
    }

    #[tokio::test]
    async fn test_oversized_audio_is_rejected() {
        let mut provider = MockAudioProvider::new();
        provider
            .expect_fetch()
            .returning(|_| Ok(ready(Some(60_000_000))));

        let reply = relay(provider, quiet_transport()).handle(&direct(LINK)).await;
        assert_eq!(reply, Some(Reply::text(TOO_LARGE_TEXT)));
    }

    #[tokio::test]
    async fn test_size_exactly_at_limit_passes() {
        let mut provider = MockAudioProvider::new();
        provider
            .expect_fetch()
            .returning(|_| Ok(ready(Some(MAX_AUDIO_SIZE_BYTES))));

        let reply = relay(provider, quiet_transport()).handle(&direct(LINK)).await;
        assert!(matches!(reply, Some(Reply::Audio(_))));
    }

    #[tokio::test]
    async fn test_provider_failure_gives_generic_text() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().returning(|_| {
            Err(ProviderError::ExtractionNotReady {
                provider_status: "processing".to_string(),
            })
        });

        let reply = relay(provider, quiet_transport()).handle(&direct(LINK)).await;
        assert_eq!(reply, Some(Reply::text(FETCH_FAILED_TEXT)));
    }

    #[tokio::test]
    async fn test_pending_metadata_never_becomes_audio() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().returning(|_| {
            Ok(AudioMetadata {
                status: AudioStatus::Pending,
                ..ready(None)
            })
        });

        let reply = relay(provider, quiet_transport()).handle(&direct(LINK)).await;
        assert_eq!(reply, Some(Reply::text(FETCH_FAILED_TEXT)));
    }

    #[tokio::test]
    async fn test_direct_without_link_gets_hint_and_no_fetch() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().never();
        let mut transport = MockChatTransport::new();
        transport.expect_indicate_working().never();

        let reply = relay(provider, transport).handle(&direct("hello there")).await;
        assert_eq!(reply, Some(Reply::text(NO_LINK_TEXT)));
    }

    #[tokio::test]
    async fn test_channel_post_without_link_is_dropped() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().never();

        let message = InboundMessage::new(
            "news of the day",
            ReplyTarget(-100),
            MessageSource::ChannelPost,
        );
        let reply = relay(provider, MockChatTransport::new()).handle(&message).await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_non_canonical_identifier_is_still_fetched() {
        let mut provider = MockAudioProvider::new();
        provider
            .expect_fetch()
            .with(eq(VideoId::new("short")))
            .times(1)
            .returning(|_| Ok(ready(None)));

        let reply = relay(provider, quiet_transport())
            .handle(&direct("https://www.youtube.com/watch?v=short"))
            .await;
        assert!(matches!(reply, Some(Reply::Audio(_))));
    }

    #[tokio::test]
    async fn test_group_message_without_link_is_dropped() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().never();

        let message = InboundMessage::new("hi all", ReplyTarget(-42), MessageSource::Group);
        let reply = relay(provider, MockChatTransport::new()).handle(&message).await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_group_message_with_link_is_relayed() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().returning(|_| Ok(ready(None)));

        let message = InboundMessage::new(LINK, ReplyTarget(-42), MessageSource::Group);
        let reply = relay(provider, quiet_transport()).handle(&message).await;
        assert!(matches!(reply, Some(Reply::Audio(_))));
    }

    #[tokio::test]
    async fn test_channel_post_with_link_is_relayed() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().returning(|_| Ok(ready(None)));

        let message = InboundMessage::new(
            format!("New upload! {LINK}"),
            ReplyTarget(-100),
            MessageSource::ChannelPost,
        );
        let reply = relay(provider, quiet_transport()).handle(&message).await;
        assert!(matches!(reply, Some(Reply::Audio(_))));
    }

    #[tokio::test]
    async fn test_working_indicator_failure_is_ignored() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().returning(|_| Ok(ready(None)));
        let mut transport = MockChatTransport::new();
        transport
            .expect_indicate_working()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("chat action failed")));

        let reply = relay(provider, transport).handle(&direct(LINK)).await;
        assert!(matches!(reply, Some(Reply::Audio(_))));
    }

    #[tokio::test]
    async fn test_process_delivers_reply() {
        let mut provider = MockAudioProvider::new();
        provider.expect_fetch().returning(|_| Ok(ready(None)));
        let mut transport = quiet_transport();
        transport
            .expect_deliver()
            .withf(|target, reply| *target == ReplyTarget(42) && matches!(reply, Reply::Audio(_)))
            .times(1)
            .returning(|_, _| Ok(()));

        relay(provider, transport).process(direct(LINK)).await;
    }

    #[tokio::test]
    async fn test_process_swallows_delivery_error() {
        let provider = MockAudioProvider::new();
        let mut transport = MockChatTransport::new();
        transport
            .expect_deliver()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("telegram down")));

        relay(provider, transport).process(direct("no link")).await;
    }

    #[tokio::test]
    async fn test_process_drops_silent_channel_post() {
        let mut transport = MockChatTransport::new();
        transport.expect_deliver().never();

        let message = InboundMessage::new("", ReplyTarget(-100), MessageSource::ChannelPost);
        relay(MockAudioProvider::new(), transport).process(message).await;
    }

    struct PanickingProvider;

    #[async_trait]
    impl AudioProvider for PanickingProvider {
        async fn fetch(&self, _video_id: &VideoId) -> Result<AudioMetadata, ProviderError> {
            panic!("provider bug")
        }
    }

    #[tokio::test]
    async fn test_process_recovers_from_panic() {
        let mut transport = quiet_transport();
        transport
            .expect_deliver()
            .withf(|_, reply| *reply == Reply::text(FETCH_FAILED_TEXT))
            .times(1)
            .returning(|_, _| Ok(()));

        Relay::new(Arc::new(PanickingProvider), Arc::new(transport))
            .process(direct(LINK))
            .await;
    }
}
