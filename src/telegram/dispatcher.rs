use super::inbound::Inbound;
use crate::relay::{Relay, Reply, HELP_TEXT};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Drain the webhook queue, handling every item on its own task.
///
/// Returns once all senders are dropped and the in-flight tasks finished.
pub async fn run_dispatcher(relay: Arc<Relay>, mut queue: UnboundedReceiver<Inbound>) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            item = queue.recv() => {
                let Some(item) = item else { break };
                let relay = Arc::clone(&relay);
                tasks.spawn(async move { dispatch(&relay, item).await });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Message task failed");
                }
            }
        }
    }

    info!(in_flight = tasks.len(), "Queue closed, waiting for in-flight messages");
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Message task failed");
        }
    }
}

async fn dispatch(relay: &Relay, item: Inbound) {
    match item {
        Inbound::Message(message) => relay.process(message).await,
        Inbound::Command { target, command } => {
            debug!(chat_id = target.0, ?command, "Answering command");
            relay.deliver(target, &Reply::text(HELP_TEXT)).await;
        }
    }
}
