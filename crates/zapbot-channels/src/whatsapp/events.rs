//! Incoming WhatsApp message handling — filtering, unwrapping, forwarding.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zapbot_core::message::IncomingMessage;

/// How long a processed message id is remembered for duplicate suppression.
const DEDUP_WINDOW: Duration = Duration::from_secs(10);

/// Recently processed inbound message ids.
///
/// WhatsApp Web occasionally re-delivers an event (reconnect, multi-device
/// sync); remembering ids for a short window keeps each customer message
/// from being answered twice.
pub(super) struct RecentIds {
    seen: HashMap<String, Instant>,
}

impl RecentIds {
    pub(super) fn new() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }

    /// Record `id`; returns `false` if it was already seen within the window.
    pub(super) fn insert(&mut self, id: &str) -> bool {
        let now = Instant::now();
        self.seen
            .retain(|_, seen_at| now.duration_since(*seen_at) < DEDUP_WINDOW);
        self.seen.insert(id.to_string(), now).is_none()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.seen.len()
    }
}

/// Process one incoming WhatsApp message event.
///
/// Filters out groups, our own messages (and their echoes), duplicate
/// deliveries, and unauthorized senders, then unwraps the text payload and
/// forwards it to the gateway.
#[allow(clippy::too_many_arguments)]
pub(super) async fn handle_whatsapp_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
    tx: &mpsc::Sender<IncomingMessage>,
    allowed: &[String],
    sent_ids: &Arc<Mutex<HashSet<String>>>,
    recent_ids: &Arc<Mutex<RecentIds>>,
) {
    debug!(
        "WA msg: is_group={}, is_from_me={}, sender={}, chat={}",
        info.source.is_group, info.source.is_from_me, info.source.sender.user, info.source.chat.user,
    );

    // Customer-contact bot: direct chats only.
    if info.source.is_group {
        debug!("WA filtered: ignoring group message");
        return;
    }

    let msg_id = info.id.clone();

    // Our own outbound messages come back as events too. Drop them, and keep
    // the sent-id set from growing by removing the matching entry.
    if info.source.is_from_me {
        sent_ids.lock().await.remove(&msg_id);
        return;
    }

    if !recent_ids.lock().await.insert(&msg_id) {
        debug!("skipping duplicate delivery: {msg_id}");
        return;
    }

    let phone = info.source.sender.user.clone();
    if !allowed.is_empty() && !allowed.contains(&phone) {
        warn!("ignoring whatsapp message from unauthorized {phone}");
        return;
    }

    // Unwrap nested wrappers (device_sent, ephemeral, view_once).
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(&msg);

    let text = inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .unwrap_or("")
        .to_string();

    // Text-only bot: media and empty payloads are dropped.
    if text.is_empty() {
        debug!("WA filtered: no text payload");
        return;
    }

    let chat_jid = info.source.chat.to_string();
    let sender_name = if info.push_name.is_empty() {
        None
    } else {
        Some(info.push_name.clone())
    };

    let incoming = IncomingMessage {
        id: Uuid::new_v4(),
        channel: "whatsapp".to_string(),
        sender_id: phone,
        sender_name,
        text,
        timestamp: chrono::Utc::now(),
        reply_target: Some(chat_jid),
    };

    if tx.send(incoming).await.is_err() {
        info!("whatsapp channel receiver dropped");
    }
}
