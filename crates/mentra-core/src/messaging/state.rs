use serde::Serialize;

use super::store::InboxConversation;
use crate::contact::Contact;

/// Why a numbered contact list is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SelectionPurpose {
    /// Pick the recipient of the pending message.
    Recipient,
    /// Bind the named alias to the picked contact.
    Alias(String),
    /// Open the picked contact's thread, showing up to `count` messages.
    Read(usize),
}

/// Where the messaging conversation is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ConversationState {
    None,
    AwaitingRecipientChoice,
    AwaitingPhoneNumber,
    AwaitingMessageBody,
    AwaitingConfirmation,
    AwaitingAliasSelection,
    AwaitingAliasPhoneNumber,
    /// The host may show its contact picker; typed input is searched.
    AwaitingContactPick,
    AwaitingContactListSelection {
        candidates: Vec<Contact>,
        purpose: SelectionPurpose,
    },
    AwaitingThreadSelection {
        candidates: Vec<InboxConversation>,
        count: usize,
    },
    Sending,
}

impl ConversationState {
    pub fn is_active(&self) -> bool {
        !matches!(self, ConversationState::None)
    }
}

/// The one message being assembled. Cleared with the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PendingMessage {
    pub recipient: Option<String>,
    pub recipient_name: Option<String>,
    pub body: Option<String>,
    /// Alias being set up on the way to sending.
    pub alias: Option<String>,
}

impl PendingMessage {
    pub fn display_recipient(&self) -> String {
        match (&self.recipient_name, &self.recipient) {
            (Some(name), _) => name.clone(),
            (None, Some(number)) => number.clone(),
            (None, None) => "recipient".to_string(),
        }
    }
}

/// The thread `reply` sends to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenThread {
    pub address: String,
    pub name: Option<String>,
}

impl OpenThread {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}
