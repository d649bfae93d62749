//! OpenRouter provider — reply generation over the OpenAI-compatible
//! chat-completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};
use zapbot_core::{
    config::OpenRouterConfig,
    context::Context,
    error::ZapError,
    message::{MessageMetadata, OutgoingMessage},
    traits::Provider,
};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter provider — routes requests to many models via one API.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    referer: String,
    app_title: String,
}

/// Chat-completion request body.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat-completion response body. Everything is optional — OpenRouter
/// proxies many upstreams and not all of them fill every field.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

impl OpenRouterProvider {
    /// Create from config values.
    pub fn from_config(cfg: &OpenRouterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: cfg.resolved_api_key(),
            model: cfg.model.clone(),
            referer: cfg.referer.clone(),
            app_title: cfg.app_title.clone(),
        }
    }

    /// Flatten a context into the wire message list (system prompt first).
    fn build_messages(context: &Context) -> Vec<ChatMessage> {
        let (system, api_messages) = context.to_api_messages();

        let mut messages = Vec::with_capacity(api_messages.len() + 1);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        for msg in api_messages {
            messages.push(ChatMessage {
                role: msg.role,
                content: msg.content,
            });
        }
        messages
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, ZapError> {
        let start = Instant::now();
        let url = format!("{OPENROUTER_BASE_URL}/chat/completions");
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::build_messages(context),
        };

        debug!(
            "openrouter: POST {url} model={} history={}",
            self.model,
            context.history.len()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(&body)
            .send()
            .await
            .map_err(|e| ZapError::Provider(format!("openrouter request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ZapError::Provider(format!(
                "openrouter returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| ZapError::Provider(format!("openrouter: failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_ref())
            .map(|c| c.trim().to_string())
            .ok_or_else(|| ZapError::Provider("openrouter: empty response".to_string()))?;

        let tokens = parsed.usage.as_ref().and_then(|u| u.total_tokens);

        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata {
                provider_used: "openrouter".to_string(),
                tokens_used: tokens,
                processing_time_ms: start.elapsed().as_millis() as u64,
                model: parsed.model,
            },
            reply_target: None,
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openrouter: no API key configured");
            return false;
        }
        let url = format!("{OPENROUTER_BASE_URL}/models");
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openrouter not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapbot_core::context::ContextEntry;

    fn provider() -> OpenRouterProvider {
        OpenRouterProvider::from_config(&OpenRouterConfig {
            api_key: "sk-or-test".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_provider_name() {
        let p = provider();
        assert_eq!(p.name(), "openrouter");
        assert!(p.requires_api_key());
    }

    #[test]
    fn test_base_url() {
        assert_eq!(OPENROUTER_BASE_URL, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_build_messages_system_first() {
        let ctx = Context {
            system_prompt: "Você é o Brunno.".into(),
            history: vec![
                ContextEntry {
                    role: "user".into(),
                    content: "oi".into(),
                },
                ContextEntry {
                    role: "assistant".into(),
                    content: "Olá!".into(),
                },
            ],
            current_message: "quero um site".into(),
        };
        let messages = OpenRouterProvider::build_messages(&ctx);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
        assert_eq!(messages[3].content, "quero um site");
    }

    #[test]
    fn test_build_messages_skips_empty_system() {
        let ctx = Context::new("oi");
        let messages = OpenRouterProvider::build_messages(&ctx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "model": "deepseek/deepseek-chat-v3-0324:free",
            "choices": [{"message": {"role": "assistant", "content": " Olá! "}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let content = parsed.choices.unwrap()[0]
            .message
            .as_ref()
            .unwrap()
            .content
            .clone()
            .unwrap();
        assert_eq!(content.trim(), "Olá!");
        assert_eq!(parsed.usage.unwrap().total_tokens, Some(15));
    }
}
