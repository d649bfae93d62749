use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Who authored a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Chat-completion role for this sender.
    pub fn as_role(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "assistant",
        }
    }
}

/// Which handling branch processes the next inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Initial,
    CollectingBusinessInfo,
    ProposingSolution,
}

/// One message in a conversation's bounded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Conversation state for one customer identity.
///
/// `created_at` marks when this state was created and is never refreshed by
/// activity — expiry is measured from the conversation's first message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Unique id, assigned at creation, stable for this state's lifetime.
    pub id: Uuid,
    /// The lookup key (phone-number-like token, not validated here).
    pub identity: String,
    /// Ordered history, oldest first, capped by the store.
    pub messages: Vec<StoredMessage>,
    pub stage: Stage,
    /// Structured intake fields accumulated across turns.
    pub collected_info: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_roles() {
        assert_eq!(Sender::User.as_role(), "user");
        assert_eq!(Sender::Bot.as_role(), "assistant");
    }

    #[test]
    fn test_stage_serde_labels() {
        assert_eq!(
            serde_json::to_string(&Stage::CollectingBusinessInfo).unwrap(),
            "\"collecting_business_info\""
        );
        assert_eq!(
            serde_json::from_str::<Stage>("\"initial\"").unwrap(),
            Stage::Initial
        );
    }

    #[test]
    fn test_sender_serde_labels() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Sender::Bot).unwrap(), "\"bot\"");
    }
}
