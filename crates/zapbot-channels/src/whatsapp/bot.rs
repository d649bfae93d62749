//! Bot lifecycle — building and running the WhatsApp connection.

use super::events::handle_whatsapp_message;
use super::qr::generate_qr_terminal;
use super::WhatsAppChannel;
use crate::session::SessionStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;
use zapbot_core::{error::ZapError, message::IncomingMessage};

impl WhatsAppChannel {
    /// Build the WhatsApp bot with our event handler and run it in the
    /// background. Incoming customer messages flow into `tx`.
    pub(super) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<IncomingMessage>,
    ) -> Result<(), ZapError> {
        let db_path = self.session_db_path();
        let allowed_users = self.config.allowed_users.clone();
        let client_handle = self.client.clone();

        info!("WhatsApp bot building (session: {db_path})...");

        let backend = Arc::new(
            SessionStore::new(&db_path)
                .await
                .map_err(|e| ZapError::Channel(format!("whatsapp session store init failed: {e}")))?,
        );

        let client_for_event = client_handle.clone();
        let sent_ids_for_event = self.sent_ids.clone();
        let recent_ids_for_event = self.recent_ids.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_os_info(Some("zapbot".to_string()), None)
            .on_event(move |event, client| {
                let tx = tx.clone();
                let allowed = allowed_users.clone();
                let client_store = client_for_event.clone();
                let sent_ids = sent_ids_for_event.clone();
                let recent_ids = recent_ids_for_event.clone();
                async move {
                    match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("WhatsApp QR code generated (scan once to pair)");
                            match generate_qr_terminal(&code) {
                                Ok(art) => {
                                    println!("📱 Escaneie este QR Code apenas uma vez:\n{art}")
                                }
                                Err(e) => warn!("failed to render pairing QR: {e}"),
                            }
                        }
                        Event::PairSuccess(_) => {
                            info!("WhatsApp pairing successful");
                        }
                        Event::Connected(_) => {
                            info!("WhatsApp connected");
                            *client_store.lock().await = Some(client);
                        }
                        Event::Disconnected(_) => {
                            warn!("WhatsApp disconnected");
                            *client_store.lock().await = None;
                        }
                        Event::LoggedOut(_) => {
                            warn!("WhatsApp logged out — session invalidated, delete the session dir and re-pair");
                            *client_store.lock().await = None;
                        }
                        Event::Message(msg, info) => {
                            handle_whatsapp_message(
                                *msg,
                                info,
                                &tx,
                                &allowed,
                                &sent_ids,
                                &recent_ids,
                            )
                            .await;
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await
            .map_err(|e| ZapError::Channel(format!("whatsapp bot build failed: {e}")))?;

        // Store client reference immediately if already paired.
        *client_handle.lock().await = Some(bot.client());

        let _handle = bot
            .run()
            .await
            .map_err(|e| ZapError::Channel(format!("whatsapp bot run failed: {e}")))?;

        info!("WhatsApp bot started");
        Ok(())
    }
}
