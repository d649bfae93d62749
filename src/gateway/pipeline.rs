//! Message processing pipeline — the main handle_message flow.

use super::keywords::*;
use super::Gateway;
use tracing::{error, info, warn};
use zapbot_catalog::{format_services, TOPIC_ABOUT};
use zapbot_context::{ConversationState, Sender, Stage};
use zapbot_core::{
    context::{Context, ContextEntry},
    message::IncomingMessage,
    sanitize,
};

impl Gateway {
    /// Process a single incoming customer message.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        let preview = if incoming.text.chars().count() > 60 {
            let truncated: String = incoming.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            incoming.text.clone()
        };
        info!(
            "[{}] {} says: {}",
            incoming.channel,
            incoming.sender_name.as_deref().unwrap_or(&incoming.sender_id),
            preview
        );

        // Neutralize injection patterns before anything reaches the provider.
        let sanitized = sanitize::sanitize(&incoming.text);
        if sanitized.was_modified {
            warn!(
                "sanitized input from {}: {:?}",
                incoming.sender_id, sanitized.warnings
            );
        }
        let text = sanitized.text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let msg_lower = text.to_lowercase();

        // Resolve the conversation (an expired one resets here) and record
        // the customer message.
        let conversation = self
            .store
            .add_message(&incoming.sender_id, &text, Sender::User);

        // Mid-intake messages go straight to the collection flow.
        if conversation.stage == Stage::CollectingBusinessInfo {
            return self.handle_intake(&incoming, &conversation, &text).await;
        }

        // Direct-answer keywords.
        if kw_match(&msg_lower, SERVICES_KW) {
            let services = self.catalog.list_services().await.unwrap_or_else(|e| {
                error!("catalog lookup failed: {e}");
                Vec::new()
            });
            let reply = format_services(&services);
            return self.send_reply(&incoming, &reply).await;
        }

        if kw_match(&msg_lower, ABOUT_KW) {
            let snippets = self.catalog.snippets(TOPIC_ABOUT).await.unwrap_or_else(|e| {
                error!("catalog lookup failed: {e}");
                Vec::new()
            });
            let reply = if snippets.is_empty() {
                "⚠️ Ainda não tenho essa informação por aqui.".to_string()
            } else {
                snippets.join("\n\n")
            };
            return self.send_reply(&incoming, &reply).await;
        }

        if kw_match(&msg_lower, INTAKE_KW) {
            return self.start_intake(&incoming).await;
        }

        // Everything else goes to the reply provider.
        self.handle_llm(&incoming, &conversation, &text).await;
    }

    /// Generate a reply through the provider, with conversation history.
    pub(super) async fn handle_llm(
        &self,
        incoming: &IncomingMessage,
        conversation: &ConversationState,
        text: &str,
    ) {
        // Keep the typing indicator alive while the provider call runs.
        let typing_handle = if let Some(ref target) = incoming.reply_target {
            let channel = self.channel.clone();
            let target = target.clone();
            let _ = channel.send_typing(&target).await;
            Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    if channel.send_typing(&target).await.is_err() {
                        break;
                    }
                }
            }))
        } else {
            None
        };

        // The just-appended customer message is the last stored entry;
        // history is the window of messages before it.
        let window = self.config.context.history_window;
        let history: Vec<ContextEntry> = conversation
            .messages
            .iter()
            .rev()
            .skip(1)
            .take(window)
            .map(|m| ContextEntry {
                role: m.sender.as_role().to_string(),
                content: m.text.clone(),
            })
            .rev()
            .collect();

        let context = Context {
            system_prompt: self.prompts.system.clone(),
            history,
            current_message: text.to_string(),
        };

        match self.provider.complete(&context).await {
            Ok(reply) => {
                info!(
                    "[{}] {} replied in {}ms (model: {})",
                    incoming.channel,
                    reply.metadata.provider_used,
                    reply.metadata.processing_time_ms,
                    reply.metadata.model.as_deref().unwrap_or("unknown"),
                );
                if let Some(h) = typing_handle {
                    h.abort();
                }
                self.send_reply(incoming, &reply.text).await;
            }
            Err(e) => {
                warn!("provider failed for {}: {e}", incoming.sender_id);
                if let Some(h) = typing_handle {
                    h.abort();
                }
                let fallback = self.prompts.fallback.clone();
                self.send_reply(incoming, &fallback).await;
            }
        }
    }
}
