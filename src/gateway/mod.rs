//! Gateway — the event loop connecting the channel, the conversation store,
//! the catalog, and the reply provider.

mod intake;
mod keywords;
mod pipeline;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use zapbot_catalog::Catalog;
use zapbot_context::{spawn_sweeper, ConversationStore, Sender};
use zapbot_core::{
    config::{Config, Prompts},
    message::{IncomingMessage, MessageMetadata, OutgoingMessage},
    traits::{Channel, Provider},
};

/// The central gateway that routes customer messages.
pub struct Gateway {
    pub(super) provider: Arc<dyn Provider>,
    pub(super) channel: Arc<dyn Channel>,
    pub(super) store: Arc<ConversationStore>,
    pub(super) catalog: Catalog,
    pub(super) prompts: Prompts,
    pub(super) config: Config,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        provider: Arc<dyn Provider>,
        channel: Arc<dyn Channel>,
        store: Arc<ConversationStore>,
        catalog: Catalog,
        prompts: Prompts,
        config: Config,
    ) -> Self {
        Self {
            provider,
            channel,
            store,
            catalog,
            prompts,
            config,
        }
    }

    /// Run the main event loop until ctrl-c.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "zapbot gateway running | provider: {} | channel: {}",
            self.provider.name(),
            self.channel.name(),
        );

        let mut rx: mpsc::Receiver<IncomingMessage> = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel: {e}"))?;

        // Background expiry sweep for the conversation store.
        let sweeper_handle = if self.config.context.sweep_interval_secs > 0 {
            Some(spawn_sweeper(
                self.store.clone(),
                Duration::from_secs(self.config.context.sweep_interval_secs),
            ))
        } else {
            None
        };

        // Daily outbound messages.
        let sched_handle = if self.config.scheduler.enabled && !self.config.schedule.is_empty() {
            let channel = self.channel.clone();
            let schedule = self.config.schedule.clone();
            let poll_secs = self.config.scheduler.poll_interval_secs;
            Some(tokio::spawn(async move {
                Self::scheduler_loop(channel, schedule, poll_secs).await;
            }))
        } else {
            None
        };

        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.handle_message(incoming).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        // Graceful shutdown.
        if let Some(h) = sweeper_handle {
            h.abort();
        }
        if let Some(h) = sched_handle {
            h.abort();
        }
        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel: {e}");
        }
        info!("Shutdown complete.");

        Ok(())
    }

    /// Record a bot reply in the conversation, then deliver it after the
    /// configured humanizing delay.
    pub(super) async fn send_reply(&self, incoming: &IncomingMessage, text: &str) {
        self.store
            .add_message(&incoming.sender_id, text, Sender::Bot);

        let delay = self.config.bot.reply_delay_ms;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let msg = OutgoingMessage {
            text: text.to_string(),
            metadata: MessageMetadata::default(),
            reply_target: incoming.reply_target.clone(),
        };
        if let Err(e) = self.channel.send(msg).await {
            error!("failed to send reply to {}: {e}", incoming.sender_id);
        }
    }
}
