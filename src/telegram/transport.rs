use crate::relay::{AudioReply, ChatTransport, Reply, ReplyTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, InputFile};
use url::Url;

/// Telegram Bot API implementation of [`ChatTransport`].
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Create a transport sending through `bot`.
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_audio(&self, chat_id: ChatId, audio: &AudioReply) -> Result<()> {
        // Telegram downloads the file itself; nothing is streamed through us.
        let link = Url::parse(&audio.link).context("provider returned an invalid audio link")?;

        let mut req = self
            .bot
            .send_audio(chat_id, InputFile::url(link))
            .title(audio.title.clone())
            .performer(audio.performer.clone());
        if let Some(duration) = audio.duration {
            req = req.duration(duration);
        }
        if let Some(caption) = &audio.caption {
            req = req.caption(caption.clone());
        }

        req.await
            .map_err(|e| anyhow::anyhow!("Telegram sendAudio error: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn indicate_working(&self, target: ReplyTarget) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(target.0), ChatAction::UploadVoice)
            .await
            .map_err(|e| anyhow::anyhow!("Telegram sendChatAction error: {e}"))?;
        Ok(())
    }

    async fn deliver(&self, target: ReplyTarget, reply: &Reply) -> Result<()> {
        let chat_id = ChatId(target.0);
        match reply {
            Reply::Text(text) => {
                self.bot
                    .send_message(chat_id, text.clone())
                    .await
                    .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))?;
                Ok(())
            }
            Reply::Audio(audio) => self.send_audio(chat_id, audio).await,
        }
    }
}
