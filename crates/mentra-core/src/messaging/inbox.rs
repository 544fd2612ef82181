//! Inbox listing, thread reading and quick replies.

use std::path::Path;
use tracing::{debug, warn};

use super::engine::MessagingEngine;
use super::state::{ConversationState, OpenThread, SelectionPurpose};
use super::store::{InboxConversation, ShellMessage, build_inbox, thread_messages};
use crate::phone;
use crate::result::ShellOutput;

/// How many threads a fuzzy `read` searches.
const THREAD_SEARCH_LIMIT: usize = 50;
const PREVIEW_CHARS: usize = 40;

enum InboxCommand<'a> {
    List,
    Unread,
    Read { target: &'a str, count: Option<usize> },
    Reply(&'a str),
    Close,
}

fn parse_inbox_command(input: &str) -> Option<InboxCommand<'_>> {
    let trimmed = input.trim();
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    match verb.to_lowercase().as_str() {
        "inbox" if rest.is_empty() => Some(InboxCommand::List),
        "messages" if rest.is_empty() => Some(InboxCommand::List),
        "unread" if rest.is_empty() => Some(InboxCommand::Unread),
        "close" if rest.is_empty() => Some(InboxCommand::Close),
        "reply" => Some(InboxCommand::Reply(rest)),
        "inbox" | "chat" => Some(read_command(rest)),
        // `read notes.txt` stays a file read
        "read" if !rest.is_empty() && !looks_like_path(rest) => Some(read_command(rest)),
        _ => None,
    }
}

/// Splits a trailing message count off a `read` target.
fn read_command(rest: &str) -> InboxCommand<'_> {
    if let Some((target, last)) = rest.rsplit_once(char::is_whitespace) {
        if let Ok(count) = last.parse::<usize>() {
            if count > 0 && !phone::is_bare_number(rest) {
                return InboxCommand::Read {
                    target: target.trim(),
                    count: Some(count),
                };
            }
        }
    }
    InboxCommand::Read {
        target: rest,
        count: None,
    }
}

fn looks_like_path(target: &str) -> bool {
    target.contains('/') || Path::new(target).extension().is_some()
}

impl MessagingEngine {
    pub(super) fn is_inbox_command(input: &str) -> bool {
        parse_inbox_command(input).is_some()
    }

    pub(super) async fn handle_inbox_command(&mut self, input: &str) -> Option<Vec<ShellOutput>> {
        let out = match parse_inbox_command(input)? {
            InboxCommand::List => self.list_inbox().await,
            InboxCommand::Unread => self.unread_summary().await,
            InboxCommand::Read { target, count } => {
                let count = count.unwrap_or(self.config.thread_limit).max(1);
                self.read_thread(target, count).await
            }
            InboxCommand::Reply(text) => self.reply(text).await,
            InboxCommand::Close => self.close_thread(),
        };
        Some(out)
    }

    /// Ends quick-reply mode.
    pub fn close_thread(&mut self) -> Vec<ShellOutput> {
        match self.open_thread.take() {
            Some(thread) => vec![ShellOutput::info(format!(
                "Closed conversation with {}",
                thread.display_name()
            ))],
            None => vec![ShellOutput::info("No open conversation")],
        }
    }

    async fn list_inbox(&self) -> Vec<ShellOutput> {
        let messages = match self.store.all_messages().await {
            Ok(messages) => messages,
            Err(e) => return vec![ShellOutput::error(format!("❌ Could not load messages: {}", e))],
        };
        let inbox = self
            .named(build_inbox(&messages, self.config.inbox_limit))
            .await;
        if inbox.is_empty() {
            return vec![ShellOutput::info("No messages")];
        }

        let mut out = vec![ShellOutput::info("Recent conversations:")];
        for (i, thread) in inbox.iter().enumerate() {
            let unread = match thread.unread_count {
                0 => String::new(),
                n => format!(" ({} unread)", n),
            };
            let who = if thread.is_outgoing { "You: " } else { "" };
            out.push(ShellOutput::info(format!(
                "{}. {}{}: {}{} [{}]",
                i + 1,
                thread.display_name(),
                unread,
                who,
                preview(&thread.last_message),
                thread
                    .last_message_time
                    .with_timezone(&chrono::Local)
                    .format("%b %d %H:%M")
            )));
        }
        out.push(ShellOutput::info("Type 'read <name>' to open a conversation"));
        out
    }

    async fn unread_summary(&self) -> Vec<ShellOutput> {
        let messages = match self.store.all_messages().await {
            Ok(messages) => messages,
            Err(e) => return vec![ShellOutput::error(format!("❌ Could not load messages: {}", e))],
        };
        let unread: usize = build_inbox(&messages, usize::MAX)
            .iter()
            .map(|t| t.unread_count)
            .sum();
        match unread {
            0 => vec![ShellOutput::info("No unread messages")],
            1 => vec![ShellOutput::info("You have 1 unread message")],
            n => vec![ShellOutput::info(format!("You have {} unread messages", n))],
        }
    }

    /// Opens a thread by alias, exact number, thread name or contact name.
    async fn read_thread(&mut self, target: &str, count: usize) -> Vec<ShellOutput> {
        if target.is_empty() {
            return vec![ShellOutput::error("Usage: read <contact> [count]")];
        }
        if let Ok(Some(alias)) = self.aliases.get(target).await {
            let name = (alias.contact_name != alias.phone_number).then_some(alias.contact_name);
            return self.show_thread(&alias.phone_number, name, count).await;
        }
        if phone::is_bare_number(target) {
            return self
                .show_thread(&phone::normalize_number(target), None, count)
                .await;
        }

        let messages = self.store.all_messages().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load messages for thread search");
            Vec::new()
        });
        let query = target.to_lowercase();
        let mut threads: Vec<InboxConversation> = self
            .named(build_inbox(&messages, THREAD_SEARCH_LIMIT))
            .await
            .into_iter()
            .filter(|t| {
                t.display_name().to_lowercase().contains(&query) || t.address.contains(target)
            })
            .collect();

        if threads.len() > 1 {
            let mut out = vec![ShellOutput::info(format!(
                "Found {} conversations:",
                threads.len()
            ))];
            out.extend(threads.iter().enumerate().map(|(i, t)| {
                ShellOutput::info(format!("  {}. {} ({})", i + 1, t.display_name(), t.address))
            }));
            out.push(ShellOutput::prompt(format!(
                "Enter number to select (1-{}):",
                threads.len()
            )));
            self.state = ConversationState::AwaitingThreadSelection {
                candidates: threads,
                count,
            };
            return out;
        }
        if let Some(thread) = threads.pop() {
            return self
                .show_thread(&thread.address, thread.contact_name, count)
                .await;
        }

        let mut contacts = self.search_contacts(target).await;
        if contacts.len() > 1 {
            let header = format!("Found {} contacts:", contacts.len());
            return self.offer_contacts(contacts, SelectionPurpose::Read(count), header);
        }
        match contacts.pop() {
            Some(contact) => {
                let number = contact.primary_number().unwrap_or_default().to_string();
                self.show_thread(&number, Some(contact.name), count).await
            }
            None => vec![ShellOutput::error(format!(
                "No conversation found for \"{}\"",
                target
            ))],
        }
    }

    /// Prints the last `count` messages with `address`, marks them read,
    /// and makes the thread the quick-reply target.
    pub(super) async fn show_thread(
        &mut self,
        address: &str,
        name: Option<String>,
        count: usize,
    ) -> Vec<ShellOutput> {
        let name = match name {
            Some(name) => Some(name),
            None => self.contacts.name_for_number(address).await.ok().flatten(),
        };
        let messages = match self.store.all_messages().await {
            Ok(messages) => messages,
            Err(e) => return vec![ShellOutput::error(format!("❌ Could not load messages: {}", e))],
        };
        let thread = thread_messages(&messages, address, count);
        let opened = OpenThread {
            address: address.to_string(),
            name,
        };

        let mut out = Vec::with_capacity(thread.len() + 2);
        if thread.is_empty() {
            out.push(ShellOutput::info(format!(
                "No messages with {} yet",
                opened.display_name()
            )));
        } else {
            let header = match &opened.name {
                Some(name) => format!("Conversation with {} ({}):", name, opened.address),
                None => format!("Conversation with {}:", opened.address),
            };
            out.push(ShellOutput::info(header));
            out.extend(thread.iter().map(|m| ShellOutput::info(thread_line(m))));
            match self.store.mark_thread_read(address).await {
                Ok(changed) => debug!(address, changed, "Marked thread read"),
                Err(e) => warn!(address, error = %e, "Failed to mark thread read"),
            }
        }
        out.push(ShellOutput::info(
            "Type 'reply <message>' to respond, 'close' when done",
        ));
        self.open_thread = Some(opened);
        out
    }

    /// Sends to the open thread without resolving a recipient.
    async fn reply(&mut self, text: &str) -> Vec<ShellOutput> {
        let Some(thread) = self.open_thread.clone() else {
            return vec![ShellOutput::error(
                "No open conversation. Use 'read <contact>' first",
            )];
        };
        if text.is_empty() {
            return vec![ShellOutput::error("Usage: reply <message>")];
        }
        vec![
            self.deliver(&thread.address, text, thread.display_name())
                .await,
        ]
    }

    async fn named(&self, mut inbox: Vec<InboxConversation>) -> Vec<InboxConversation> {
        for thread in inbox.iter_mut() {
            if thread.contact_name.is_none() {
                thread.contact_name = self
                    .contacts
                    .name_for_number(&thread.address)
                    .await
                    .ok()
                    .flatten();
            }
        }
        inbox
    }
}

fn thread_line(message: &ShellMessage) -> String {
    let arrow = if message.is_outgoing { ">" } else { "<" };
    format!("{} {}  [{}]", arrow, message.body, message.formatted_time())
}

fn preview(body: &str) -> String {
    let first_line = body.lines().next().unwrap_or_default();
    if first_line.chars().count() > PREVIEW_CHARS {
        let cut: String = first_line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::engine::tests::fixture_with;
    use super::*;
    use crate::config::MessagingConfig;
    use crate::testing::incoming;
    use pretty_assertions::assert_eq;

    fn sample_messages() -> Vec<ShellMessage> {
        vec![
            incoming("1", "+15550001111", "lunch?", 1, false),
            incoming("2", "+254712345678", "call me", 2, false),
            incoming("3", "+15550001111", "hello?", 3, false),
            incoming("4", "+15550003333", "done", 4, true),
        ]
    }

    #[test]
    fn test_parse_inbox_commands() {
        assert!(matches!(parse_inbox_command("inbox"), Some(InboxCommand::List)));
        assert!(matches!(parse_inbox_command("messages"), Some(InboxCommand::List)));
        assert!(matches!(
            parse_inbox_command("inbox mary 5"),
            Some(InboxCommand::Read {
                target: "mary",
                count: Some(5)
            })
        ));
        assert!(matches!(
            parse_inbox_command("read 0712345678"),
            Some(InboxCommand::Read { count: None, .. })
        ));
        assert!(matches!(parse_inbox_command("reply ok"), Some(InboxCommand::Reply("ok"))));
        assert!(parse_inbox_command("read notes.txt").is_none());
        assert!(parse_inbox_command("read").is_none());
        assert!(parse_inbox_command("text mom").is_none());
    }

    #[tokio::test]
    async fn test_inbox_and_unread() {
        let mut f = fixture_with(MessagingConfig::default(), sample_messages());
        let out = f.engine.handle_command("inbox").await;
        assert_eq!(out[0].text, "Recent conversations:");
        assert!(out[1].text.starts_with("1. Bob Builder: done ["));
        assert!(out[2].text.starts_with("2. Jane Doe (2 unread): hello? ["));
        assert!(out[3].text.starts_with("3. Mary Jane (1 unread): call me ["));

        let out = f.engine.handle_command("unread").await;
        assert_eq!(out[0].text, "You have 3 unread messages");
        assert_eq!(f.engine.state(), &ConversationState::None);
    }

    #[tokio::test]
    async fn test_read_ambiguous_then_select_and_reply() {
        let mut f = fixture_with(MessagingConfig::default(), sample_messages());
        let out = f.engine.handle_command("read jane").await;
        assert_eq!(out[0].text, "Found 2 conversations:");
        assert_eq!(out[1].text, "  1. Jane Doe (+15550001111)");

        let out = f.engine.handle_command("1").await;
        assert_eq!(out[0].text, "Conversation with Jane Doe (+15550001111):");
        assert!(out[1].text.starts_with("< lunch?  ["));
        assert!(out[2].text.starts_with("< hello?  ["));
        assert!(!f.engine.is_in_conversation());
        assert!(
            f.store
                .snapshot()
                .iter()
                .filter(|m| m.address == "+15550001111")
                .all(|m| m.is_read)
        );

        // An unrelated command leaves the reply target in place.
        f.engine.handle_command("unread").await;
        let out = f.engine.handle_command("reply on my way").await;
        assert_eq!(out[0].text, "✅ Sent to Jane Doe");
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550001111".to_string(), "on my way".to_string(), 0)]
        );

        let out = f.engine.handle_command("close").await;
        assert_eq!(out[0].text, "Closed conversation with Jane Doe");
        let out = f.engine.handle_command("reply again").await;
        assert_eq!(out[0].text, "No open conversation. Use 'read <contact>' first");
    }

    #[tokio::test]
    async fn test_read_single_match_alias_and_limit() {
        let mut f = fixture_with(MessagingConfig::default(), sample_messages());
        let out = f.engine.handle_command("chat mary").await;
        assert_eq!(out[0].text, "Conversation with Mary Jane (+254712345678):");

        f.engine.handle_command("alias jd = +15550001111").await;
        let out = f.engine.handle_command("inbox jd 1").await;
        assert_eq!(out[0].text, "Conversation with Jane Doe (+15550001111):");
        assert!(out[1].text.starts_with("< hello?"));
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn test_read_contact_without_thread() {
        let mut f = fixture_with(MessagingConfig::default(), Vec::new());
        let out = f.engine.handle_command("read john").await;
        assert_eq!(out[0].text, "No messages with John Doe yet");
        assert_eq!(f.engine.open_thread().map(|t| t.address.as_str()), Some("+15550002222"));

        let out = f.engine.handle_command("read zed").await;
        assert_eq!(out[0].text, "No conversation found for \"zed\"");
    }
}
