use crate::{
    context::Context,
    error::ZapError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Reply provider trait.
///
/// The hosted chat-completion API behind reply generation implements this
/// to keep the gateway independent of any one vendor's wire format.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a conversation context to the provider and get a reply.
    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, ZapError>;

    /// Check if the provider is reachable and ready.
    async fn is_available(&self) -> bool;
}

/// Messaging channel trait.
///
/// Every messaging platform the bot listens on implements this trait to
/// receive and send messages.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, ZapError>;

    /// Send a reply back through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), ZapError>;

    /// Show a typing indicator while a reply is being produced.
    async fn send_typing(&self, _target: &str) -> Result<(), ZapError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), ZapError>;
}
