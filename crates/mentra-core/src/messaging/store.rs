//! Read side of the host's message database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::phone;

/// One stored text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellMessage {
    pub id: String,
    pub address: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub is_outgoing: bool,
    pub is_read: bool,
}

impl ShellMessage {
    pub fn formatted_time(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%b %d %H:%M")
            .to_string()
    }
}

/// Latest state of one thread, as listed by `inbox`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboxConversation {
    pub address: String,
    pub contact_name: Option<String>,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: usize,
    pub is_outgoing: bool,
}

impl InboxConversation {
    pub fn display_name(&self) -> &str {
        self.contact_name.as_deref().unwrap_or(&self.address)
    }
}

/// Message storage owned by the host.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Every message, in any order.
    async fn all_messages(&self) -> Result<Vec<ShellMessage>>;

    /// Marks every incoming message in the thread read. Returns how many
    /// changed.
    async fn mark_thread_read(&self, address: &str) -> Result<usize>;

    /// Records a message the shell just sent.
    async fn record_sent(&self, address: &str, body: &str) -> Result<()>;
}

/// Threads keyed by their trailing digits, so `+2547...` and `07...`
/// land in the same conversation.
pub(crate) fn thread_key(address: &str) -> String {
    let digits = phone::normalize_number(address);
    let digits = digits.trim_start_matches('+');
    if digits.is_empty() {
        return address.trim().to_lowercase();
    }
    let tail = digits.len().min(9);
    digits[digits.len() - tail..].to_string()
}

/// Groups messages into threads, most recent first.
pub fn build_inbox(messages: &[ShellMessage], limit: usize) -> Vec<InboxConversation> {
    let mut threads: HashMap<String, InboxConversation> = HashMap::new();
    for message in messages {
        let entry = threads
            .entry(thread_key(&message.address))
            .or_insert_with(|| InboxConversation {
                address: message.address.clone(),
                contact_name: None,
                last_message: message.body.clone(),
                last_message_time: message.timestamp,
                unread_count: 0,
                is_outgoing: message.is_outgoing,
            });
        if message.timestamp > entry.last_message_time {
            entry.address = message.address.clone();
            entry.last_message = message.body.clone();
            entry.last_message_time = message.timestamp;
            entry.is_outgoing = message.is_outgoing;
        }
        if !message.is_outgoing && !message.is_read {
            entry.unread_count += 1;
        }
    }
    let mut inbox: Vec<_> = threads.into_values().collect();
    inbox.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
    inbox.truncate(limit);
    inbox
}

/// The last `limit` messages exchanged with `address`, oldest first.
pub fn thread_messages(messages: &[ShellMessage], address: &str, limit: usize) -> Vec<ShellMessage> {
    let key = thread_key(address);
    let mut thread: Vec<_> = messages
        .iter()
        .filter(|m| thread_key(&m.address) == key)
        .cloned()
        .collect();
    thread.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    let skip = thread.len().saturating_sub(limit);
    thread.split_off(skip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, address: &str, body: &str, minute: u32, outgoing: bool, read: bool) -> ShellMessage {
        ShellMessage {
            id: id.into(),
            address: address.into(),
            body: body.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
            is_outgoing: outgoing,
            is_read: read,
        }
    }

    #[test]
    fn test_build_inbox_groups_by_number() {
        let messages = vec![
            msg("1", "+254712345678", "hi", 1, false, false),
            msg("2", "0712345678", "hello back", 2, true, true),
            msg("3", "0712345678", "you there?", 3, false, false),
            msg("4", "+15550001111", "lunch?", 4, false, true),
        ];
        let inbox = build_inbox(&messages, 10);
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].last_message, "lunch?");
        assert_eq!(inbox[1].last_message, "you there?");
        assert_eq!(inbox[1].unread_count, 2);
        assert_eq!(build_inbox(&messages, 1).len(), 1);
    }

    #[test]
    fn test_thread_messages_oldest_first_and_limited() {
        let messages = vec![
            msg("3", "0712345678", "c", 3, false, false),
            msg("1", "+254712345678", "a", 1, false, false),
            msg("2", "0712345678", "b", 2, true, true),
            msg("4", "+15550001111", "other", 4, false, false),
        ];
        let bodies: Vec<_> = thread_messages(&messages, "0712345678", 2)
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["b", "c"]);
    }
}
