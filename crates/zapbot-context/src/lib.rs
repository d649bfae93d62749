//! # zapbot-context
//!
//! In-memory, expiring, bounded-history conversation state, keyed by the
//! customer's phone-number identity. This is the piece that decides how an
//! inbound message is interpreted (stage routing) and what history is sent
//! to the reply provider.

pub mod state;
pub mod store;

pub use state::{ConversationState, Sender, Stage, StoredMessage};
pub use store::{spawn_sweeper, ConversationStore};
