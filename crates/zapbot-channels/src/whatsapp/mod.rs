//! WhatsApp channel — pure Rust implementation via `whatsapp-rust`.
//!
//! Speaks the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done once by scanning a QR code printed to the terminal;
//! the session is persisted to `{data_dir}/whatsapp_session/session.db`.

mod bot;
mod channel;
mod events;
mod qr;
mod send;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use zapbot_core::config::WhatsAppConfig;

use events::RecentIds;

/// WhatsApp channel using the WhatsApp Web protocol.
pub struct WhatsAppChannel {
    pub(super) config: WhatsAppConfig,
    pub(super) data_dir: String,
    /// Client handle for sending messages — set once connected.
    pub(super) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
    /// Message IDs we sent — used to ignore our own echo.
    pub(super) sent_ids: Arc<Mutex<HashSet<String>>>,
    /// Recently processed inbound message IDs — drops duplicate deliveries.
    pub(super) recent_ids: Arc<Mutex<RecentIds>>,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel from config.
    pub fn new(config: WhatsAppConfig, data_dir: &str) -> Self {
        Self {
            config,
            data_dir: data_dir.to_string(),
            client: Arc::new(Mutex::new(None)),
            sent_ids: Arc::new(Mutex::new(HashSet::new())),
            recent_ids: Arc::new(Mutex::new(RecentIds::new())),
        }
    }

    /// Whether the client is currently connected.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Path of the session database, creating the directory if needed.
    pub(super) fn session_db_path(&self) -> String {
        let dir = zapbot_core::shellexpand(&self.data_dir);
        let session_dir = format!("{dir}/whatsapp_session");
        let _ = std::fs::create_dir_all(&session_dir);
        format!("{session_dir}/session.db")
    }
}
