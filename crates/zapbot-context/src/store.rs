//! The conversation store — creation-on-miss, lazy expiry, bounded history,
//! field-level mutation.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use zapbot_core::config::ContextConfig;

use crate::state::{ConversationState, Sender, Stage, StoredMessage};

/// Keyed store of per-customer conversation state.
///
/// Expiry is lazy: a conversation older than the TTL is replaced by a fresh
/// one on its next access, never proactively (see [`spawn_sweeper`] for the
/// optional memory-bounding sweep). The TTL is measured from `created_at`,
/// which is NOT refreshed by activity — an active chat still resets once the
/// window has elapsed since its first message.
///
/// Every operation resolves and mutates under a single lock acquisition, so
/// operations on one identity observe a total order even when the gateway
/// handles messages concurrently. All mutation goes through this store; the
/// snapshots it returns are owned copies.
pub struct ConversationStore {
    inner: Mutex<HashMap<String, ConversationState>>,
    ttl: ChronoDuration,
    max_messages: usize,
}

impl ConversationStore {
    /// Create a store from config (TTL in minutes, history cap).
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl: ChronoDuration::minutes(config.ttl_minutes),
            max_messages: config.max_messages,
        }
    }

    /// Unconditionally create a fresh conversation for `identity`,
    /// replacing any existing one.
    pub fn start(&self, identity: &str) -> ConversationState {
        let state = Self::fresh(identity, Utc::now());
        let snapshot = state.clone();
        self.lock().insert(identity.to_string(), state);
        snapshot
    }

    /// Get the current conversation for `identity`.
    ///
    /// Creates a fresh one if none exists or the existing one has expired —
    /// this access path is the entire expiry mechanism.
    pub fn get(&self, identity: &str) -> ConversationState {
        let mut map = self.lock();
        self.resolve(&mut map, identity).clone()
    }

    /// Append a message, evicting the oldest entry once the history cap is
    /// reached (FIFO). Returns the updated conversation.
    pub fn add_message(&self, identity: &str, text: &str, sender: Sender) -> ConversationState {
        let mut map = self.lock();
        let state = self.resolve(&mut map, identity);

        if state.messages.len() >= self.max_messages {
            state.messages.remove(0);
        }
        state.messages.push(StoredMessage {
            text: text.to_string(),
            sender,
            timestamp: Utc::now(),
        });

        state.clone()
    }

    /// Overwrite the conversation's stage. Returns the updated conversation.
    pub fn update_stage(&self, identity: &str, stage: Stage) -> ConversationState {
        let mut map = self.lock();
        let state = self.resolve(&mut map, identity);
        state.stage = stage;
        state.clone()
    }

    /// Shallow-merge `partial` into the collected intake fields: new keys
    /// added, existing keys overwritten, untouched keys preserved.
    /// Returns the updated conversation.
    pub fn update_collected_info<I>(&self, identity: &str, partial: I) -> ConversationState
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = self.lock();
        let state = self.resolve(&mut map, identity);
        for (key, value) in partial {
            state.collected_info.insert(key, value);
        }
        state.clone()
    }

    /// Remove the conversation for `identity`, if present. Idempotent.
    pub fn clear(&self, identity: &str) {
        self.lock().remove(identity);
    }

    /// Remove every expired conversation. Returns how many were removed.
    ///
    /// Never changes what `get` would return — an expired entry is replaced
    /// on access either way — it only releases the memory of identities that
    /// never come back.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let ttl = self.ttl;
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, state| now - state.created_at <= ttl);
        before - map.len()
    }

    /// Number of live (possibly expired-but-unswept) conversations.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ConversationState>> {
        // A poisoned lock means a panic while holding it; conversation state
        // is ephemeral, so continuing with whatever is there is fine.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve `identity` inside an already-held lock: create on miss,
    /// replace on expiry, otherwise hand back the live entry.
    fn resolve<'a>(
        &self,
        map: &'a mut HashMap<String, ConversationState>,
        identity: &str,
    ) -> &'a mut ConversationState {
        let now = Utc::now();
        match map.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                if now - entry.get().created_at > self.ttl {
                    entry.insert(Self::fresh(identity, now));
                }
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(Self::fresh(identity, now)),
        }
    }

    fn fresh(identity: &str, now: DateTime<Utc>) -> ConversationState {
        ConversationState {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            messages: Vec::new(),
            stage: Stage::Initial,
            collected_info: HashMap::new(),
            created_at: now,
        }
    }
}

/// Spawn the background expiry sweep for a shared store.
///
/// Bounds memory growth from identities that never return after expiring;
/// without it those entries would linger until process exit.
pub fn spawn_sweeper(
    store: Arc<ConversationStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = store.sweep();
            if removed > 0 {
                debug!("context sweep removed {removed} expired conversations");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::new(&ContextConfig::default())
    }

    /// A store whose TTL is already elapsed for any state older than "now".
    fn expiring_store() -> ConversationStore {
        ConversationStore::new(&ContextConfig {
            ttl_minutes: 0,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn test_first_access_creates_fresh_state() {
        let store = store();
        let state = store.get("5547999000001");
        assert_eq!(state.stage, Stage::Initial);
        assert!(state.messages.is_empty());
        assert!(state.collected_info.is_empty());
        assert_eq!(state.identity, "5547999000001");
    }

    #[test]
    fn test_get_returns_same_conversation() {
        let store = store();
        let first = store.get("A");
        let second = store.get("A");
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1, "lookups never create duplicates");
    }

    #[test]
    fn test_start_replaces_existing_state() {
        let store = store();
        let first = store.add_message("A", "oi", Sender::User);
        let replaced = store.start("A");
        assert_ne!(first.id, replaced.id);
        assert!(replaced.messages.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_messages_kept_in_call_order() {
        let store = store();
        for i in 0..10 {
            store.add_message("A", &format!("msg {i}"), Sender::User);
        }
        let state = store.get("A");
        assert_eq!(state.messages.len(), 10);
        for (i, msg) in state.messages.iter().enumerate() {
            assert_eq!(msg.text, format!("msg {i}"));
        }
    }

    #[test]
    fn test_eleventh_message_evicts_oldest() {
        let store = store();
        for i in 0..10 {
            store.add_message("A", &format!("msg {i}"), Sender::User);
        }
        let state = store.add_message("A", "msg 10", Sender::Bot);
        assert_eq!(state.messages.len(), 10, "cap holds at insertion time");
        assert_eq!(state.messages[0].text, "msg 1", "oldest dropped");
        assert_eq!(state.messages[9].text, "msg 10", "newest appended");
        assert_eq!(state.messages[9].sender, Sender::Bot);
    }

    #[test]
    fn test_collected_info_shallow_merge() {
        let store = store();
        store.update_collected_info("A", [("a".to_string(), "1".to_string())]);
        let state = store.update_collected_info("A", [("b".to_string(), "2".to_string())]);
        assert_eq!(state.collected_info.get("a").unwrap(), "1");
        assert_eq!(state.collected_info.get("b").unwrap(), "2");

        let state = store.update_collected_info("A", [("a".to_string(), "3".to_string())]);
        assert_eq!(state.collected_info.get("a").unwrap(), "3", "overwritten");
        assert_eq!(state.collected_info.get("b").unwrap(), "2", "preserved");
    }

    #[test]
    fn test_expired_state_fully_reset_on_access() {
        let store = expiring_store();
        let old = store.add_message("A", "oi", Sender::User);
        store.update_stage("A", Stage::ProposingSolution);
        std::thread::sleep(Duration::from_millis(5));

        let state = store.get("A");
        assert_ne!(state.id, old.id, "expiry produces a new id");
        assert!(state.messages.is_empty());
        assert!(state.collected_info.is_empty());
        assert_eq!(state.stage, Stage::Initial);
    }

    #[test]
    fn test_clear_then_get_is_first_access() {
        let store = store();
        let before = store.add_message("A", "oi", Sender::User);
        store.clear("A");
        let after = store.get("A");
        assert_ne!(before.id, after.id);
        assert!(after.messages.is_empty());
        assert_eq!(after.stage, Stage::Initial);
    }

    #[test]
    fn test_clear_absent_identity_is_noop() {
        let store = store();
        store.clear("never-seen");
        assert!(store.is_empty());
    }

    #[test]
    fn test_intake_scenario() {
        let store = store();
        store.start("A");
        store.add_message("A", "hi", Sender::User);
        store.update_stage("A", Stage::CollectingBusinessInfo);
        store.update_collected_info("A", [("service".to_string(), "website".to_string())]);

        let state = store.get("A");
        assert_eq!(state.stage, Stage::CollectingBusinessInfo);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].text, "hi");
        assert_eq!(state.messages[0].sender, Sender::User);
        assert_eq!(state.collected_info.get("service").unwrap(), "website");
    }

    #[test]
    fn test_identities_are_independent() {
        let store = store();
        store.add_message("A", "from A", Sender::User);
        store.add_message("B", "from B", Sender::User);
        store.update_stage("B", Stage::CollectingBusinessInfo);

        let a = store.get("A");
        let b = store.get("B");
        assert_eq!(a.stage, Stage::Initial);
        assert_eq!(b.stage, Stage::CollectingBusinessInfo);
        assert_eq!(a.messages[0].text, "from A");
        assert_eq!(b.messages[0].text, "from B");
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = expiring_store();
        store.get("gone");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.len(), 1);
        let removed = store.sweep();
        assert_eq!(removed, 1);
        assert!(store.is_empty());

        let store = store_with_long_ttl();
        store.get("kept");
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 1);
    }

    fn store_with_long_ttl() -> ConversationStore {
        ConversationStore::new(&ContextConfig {
            ttl_minutes: 60,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn test_mutation_on_expired_state_starts_fresh() {
        let store = expiring_store();
        let old = store.add_message("A", "old", Sender::User);
        std::thread::sleep(Duration::from_millis(5));

        let state = store.add_message("A", "new", Sender::User);
        assert_ne!(state.id, old.id);
        assert_eq!(state.messages.len(), 1, "history did not survive expiry");
        assert_eq!(state.messages[0].text, "new");
    }
}
