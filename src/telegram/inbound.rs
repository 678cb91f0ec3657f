//! Conversion of raw Telegram updates into relay inputs.

use crate::relay::{InboundMessage, MessageSource, ReplyTarget};
use teloxide::types::{Message, Update, UpdateKind};
use teloxide::utils::command::BotCommands;

/// Supported bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Greet the user
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage
    #[command(description = "Show how to use the bot.")]
    Help,
}

/// Work item queued by the webhook for background processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Message that goes through the relay pipeline
    Message(InboundMessage),
    /// Bot command answered with the usage text
    Command {
        /// Chat the command came from
        target: ReplyTarget,
        /// Parsed command
        command: Command,
    },
}

impl Inbound {
    /// Chat the eventual reply is addressed to.
    #[must_use]
    pub const fn target(&self) -> ReplyTarget {
        match self {
            Self::Message(message) => message.target,
            Self::Command { target, .. } => *target,
        }
    }
}

/// Turn an update into a work item.
///
/// Only new chat messages and new channel posts are relevant; edits,
/// callbacks and everything else yield `None`. `bot_username` lets
/// `/start@bot` style commands match.
#[must_use]
pub fn inbound_from_update(update: &Update, bot_username: &str) -> Option<Inbound> {
    match &update.kind {
        UpdateKind::Message(msg) => Some(from_chat_message(msg, bot_username)),
        UpdateKind::ChannelPost(post) => Some(from_channel_post(post)),
        _ => None,
    }
}

fn from_chat_message(msg: &Message, bot_username: &str) -> Inbound {
    let target = ReplyTarget(msg.chat.id.0);
    let text = msg.text().unwrap_or_default();

    if let Ok(command) = Command::parse(text, bot_username) {
        return Inbound::Command { target, command };
    }

    let source = if msg.chat.is_private() {
        MessageSource::Direct
    } else {
        MessageSource::Group
    };
    Inbound::Message(InboundMessage::new(text, target, source))
}

// Channel posts often carry the link in a media caption.
fn from_channel_post(post: &Message) -> Inbound {
    let text = post.text().or_else(|| post.caption()).unwrap_or_default();
    Inbound::Message(InboundMessage::new(
        text,
        ReplyTarget(post.chat.id.0),
        MessageSource::ChannelPost,
    ))
}
