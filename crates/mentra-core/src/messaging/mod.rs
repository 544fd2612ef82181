//! Text messaging: free-text send flows, inbox and quick replies, and
//! contact-alias commands.

mod aliases;
mod engine;
mod inbox;
mod intent;
mod state;
mod store;

pub use engine::MessagingEngine;
pub use intent::{
    IntentParser, MessagingIntent, RELATIONSHIP_KEYWORDS, SEND_KEYWORDS, extract_message,
    is_messaging_command,
};
pub use state::{ConversationState, OpenThread, SelectionPurpose};
pub use store::{InboxConversation, MessageStore, ShellMessage, build_inbox, thread_messages};
