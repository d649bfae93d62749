//! Channel trait implementation for WhatsApp.

use super::send::{retry_send, split_message, to_whatsapp_text, MAX_CHUNK_LEN};
use super::WhatsAppChannel;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;
use wacore_binary::jid::Jid;
use zapbot_core::{
    error::ZapError,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};

impl WhatsAppChannel {
    /// Send a text message to a JID string (phone@s.whatsapp.net).
    async fn send_text(&self, jid_str: &str, text: &str) -> Result<(), ZapError> {
        let client_guard = self.client.lock().await;
        let client = client_guard
            .as_ref()
            .ok_or_else(|| ZapError::Channel("whatsapp client not connected".into()))?;

        let jid: Jid = jid_str
            .parse()
            .map_err(|e| ZapError::Channel(format!("invalid whatsapp JID '{jid_str}': {e}")))?;

        let formatted = to_whatsapp_text(text);
        for chunk in split_message(&formatted, MAX_CHUNK_LEN) {
            let msg = waproto::whatsapp::Message {
                conversation: Some(chunk),
                ..Default::default()
            };
            let msg_id = retry_send(client, &jid, msg).await?;
            // Track sent ids so the echo event is recognized as ours.
            self.sent_ids.lock().await.insert(msg_id);
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, ZapError> {
        let (tx, rx) = mpsc::channel(64);
        self.build_and_run_bot(tx).await?;
        info!("WhatsApp channel started");
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), ZapError> {
        let target = message
            .reply_target
            .as_deref()
            .ok_or_else(|| ZapError::Channel("no reply_target on outgoing message".into()))?;

        self.send_text(target, &message.text).await
    }

    async fn send_typing(&self, target: &str) -> Result<(), ZapError> {
        let client_guard = self.client.lock().await;
        if let Some(ref client) = *client_guard {
            let jid: Jid = target
                .parse()
                .map_err(|e| ZapError::Channel(format!("invalid whatsapp JID '{target}': {e}")))?;
            let _ = client.chatstate().send_composing(&jid).await;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ZapError> {
        info!("WhatsApp channel stopped");
        *self.client.lock().await = None;
        Ok(())
    }
}
