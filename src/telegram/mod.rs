//! Telegram adapter: webhook intake, update conversion, queue dispatch and
//! the Bot API transport used by the relay.

/// Background consumer of the webhook queue
pub mod dispatcher;
/// Update to work item conversion
pub mod inbound;
/// Bot API implementation of the relay transport
pub mod transport;
/// HTTP webhook endpoint
pub mod webhook;

pub use dispatcher::run_dispatcher;
pub use inbound::{inbound_from_update, Command, Inbound};
pub use transport::TelegramTransport;
pub use webhook::{router, WebhookError, WebhookState};
