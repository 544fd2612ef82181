//! Free-text messaging intent extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::alias::AliasStore;
use crate::contact::Contact;
use crate::phone;

/// Words that mark a line as a request to send a text.
pub const SEND_KEYWORDS: &[&str] = &["send", "text", "sms", "message", "msg", "write", "compose"];

/// Relationship words treated as aliases even before they are set up.
pub const RELATIONSHIP_KEYWORDS: &[&str] = &[
    "wife", "husband", "mom", "mother", "dad", "father", "son", "daughter", "brother", "sister",
    "bro", "sis", "boss", "friend", "bestie", "bff", "gf", "girlfriend", "bf", "boyfriend",
    "babe", "honey", "love", "grandma", "grandpa", "grandmother", "grandfather", "uncle", "aunt",
    "cousin", "nephew", "niece", "partner", "spouse", "fiancé", "fiancee",
];

const FILLER_WORDS: &[&str] = &["a", "my", "to"];

const COMMAND_PREFIXES: &[&str] = &[
    "send", "text", "sms", "message", "msg", "compose",
];

static TO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bto\s+(\+?[0-9]{7,15}|\w+)").expect("valid to regex"));

static MY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmy\s+(\w+)").expect("valid my regex"));

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\+?\b[0-9]{7,15})\b").expect("valid number regex"));

static CONTENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:saying|say)\s+(.+)$",
        r"(?i)(?:message|text|sms):\s*(.+)$",
        r"(?i)\bthat\s+(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid content regex"))
    .collect()
});

const CONTENT_FILLERS: &[&str] = &["a message", "a text", "an sms", "message", "text", "sms"];

/// What a free-text messaging line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingIntent {
    NotAMessageCommand,
    SendToAlias {
        alias: String,
        contact: Contact,
        message: Option<String>,
    },
    SendToNumber {
        number: String,
        message: Option<String>,
    },
    /// A relationship word or `to <word>` that is not a stored alias.
    AliasNotFound(String),
    InvalidNumber(String),
    NeedRecipient(Option<String>),
}

/// True when a line should be offered to the messaging engine.
pub fn is_messaging_command(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    COMMAND_PREFIXES.iter().any(|p| lowered.starts_with(p)) || lowered.contains("message")
}

/// Turns free text into a [`MessagingIntent`], consulting stored aliases.
#[derive(Clone)]
pub struct IntentParser {
    aliases: AliasStore,
}

impl IntentParser {
    pub fn new(aliases: AliasStore) -> Self {
        Self { aliases }
    }

    /// Recognises, in order: any stored alias word, `to <number|word>`,
    /// `my <word>`, a bare number anywhere, then a relationship word.
    pub async fn parse(&self, input: &str) -> MessagingIntent {
        let lowered = input.trim().to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        if !words.iter().any(|w| SEND_KEYWORDS.contains(w)) {
            return MessagingIntent::NotAMessageCommand;
        }

        for word in &words {
            let clean: String = word
                .chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect();
            if clean.is_empty()
                || SEND_KEYWORDS.contains(&clean.as_str())
                || FILLER_WORDS.contains(&clean.as_str())
            {
                continue;
            }
            if let Some(contact) = self.alias_contact(&clean).await {
                let message = extract_message(input, Some(&clean));
                return MessagingIntent::SendToAlias {
                    alias: clean,
                    contact,
                    message,
                };
            }
        }

        // (recipient, is_alias)
        let mut recipient: Option<(String, bool)> = None;

        if let Some(caps) = TO_PATTERN.captures(input) {
            let candidate = caps[1].to_string();
            if phone::is_valid_phone_number(&candidate) {
                recipient = Some((candidate, false));
            } else {
                let key = candidate.to_lowercase();
                if let Some(contact) = self.alias_contact(&key).await {
                    let message = extract_message(input, Some(&candidate));
                    return MessagingIntent::SendToAlias {
                        alias: key,
                        contact,
                        message,
                    };
                }
                recipient = Some((key, true));
            }
        }

        if recipient.is_none() {
            if let Some(caps) = MY_PATTERN.captures(input) {
                let key = caps[1].to_lowercase();
                if let Some(contact) = self.alias_contact(&key).await {
                    let message = extract_message(input, Some(&key));
                    return MessagingIntent::SendToAlias {
                        alias: key,
                        contact,
                        message,
                    };
                }
                if RELATIONSHIP_KEYWORDS.contains(&key.as_str()) {
                    recipient = Some((key, true));
                }
            }
        }

        if recipient.is_none() {
            if let Some(caps) = NUMBER_PATTERN.captures(input) {
                recipient = Some((caps[1].to_string(), false));
            }
        }

        if recipient.is_none() {
            recipient = words
                .iter()
                .map(|w| w.chars().filter(|c| c.is_alphabetic()).collect::<String>())
                .find(|w| RELATIONSHIP_KEYWORDS.contains(&w.as_str()))
                .map(|w| (w, true));
        }

        let message = extract_message(input, recipient.as_ref().map(|(r, _)| r.as_str()));
        match recipient {
            Some((alias, true)) => match self.alias_contact(&alias).await {
                Some(contact) => MessagingIntent::SendToAlias {
                    alias,
                    contact,
                    message,
                },
                None => MessagingIntent::AliasNotFound(alias),
            },
            Some((number, false)) if phone::is_valid_phone_number(&number) => {
                MessagingIntent::SendToNumber { number, message }
            }
            Some((number, false)) => MessagingIntent::InvalidNumber(number),
            None => MessagingIntent::NeedRecipient(message),
        }
    }

    async fn alias_contact(&self, key: &str) -> Option<Contact> {
        match self.aliases.get_contact_by_alias(key).await {
            Ok(Some(contact)) if contact.primary_number().is_some() => Some(contact),
            Ok(_) => None,
            Err(e) => {
                warn!(alias = key, error = %e, "Alias lookup failed");
                None
            }
        }
    }
}

/// Pulls the message body out of a line.
///
/// Explicit markers (`saying`, `say`, `message:`, `that`) win; otherwise
/// everything after the recipient, minus a leading "a message"-style filler.
pub fn extract_message(input: &str, recipient: Option<&str>) -> Option<String> {
    for pattern in CONTENT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(input) {
            let body = caps[1].trim();
            return (!body.is_empty()).then(|| body.to_string());
        }
    }

    let recipient = recipient?;
    let edge = |c: Option<char>| match c {
        Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
        _ => "",
    };
    let pattern = format!(
        r"(?i){}{}{}",
        edge(recipient.chars().next()),
        regex::escape(recipient),
        edge(recipient.chars().last())
    );
    let finder = Regex::new(&pattern).ok()?;
    let found = finder.find(input)?;
    let mut rest = input[found.end()..].trim();
    for filler in CONTENT_FILLERS {
        if let Some(head) = rest.get(..filler.len()) {
            if head.eq_ignore_ascii_case(filler) {
                rest = rest[filler.len()..].trim_start();
            }
        }
    }
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{ContactAlias, InMemoryContactAliasRepository};
    use std::sync::Arc;

    async fn parser_with_mom() -> IntentParser {
        let store = AliasStore::new(Arc::new(InMemoryContactAliasRepository::new()));
        let jane = Contact::new("c1", "Jane", "+15550001111");
        store
            .set_alias(ContactAlias::for_contact("mom", &jane, "+15550001111"))
            .await
            .unwrap();
        store
            .set_alias(ContactAlias::for_number("dk", "0711222333"))
            .await
            .unwrap();
        IntentParser::new(store)
    }

    #[tokio::test]
    async fn test_registered_alias_with_body() {
        let parser = parser_with_mom().await;
        match parser.parse("text mom hello").await {
            MessagingIntent::SendToAlias { alias, contact, message } => {
                assert_eq!(alias, "mom");
                assert_eq!(contact.primary_number(), Some("+15550001111"));
                assert_eq!(message.as_deref(), Some("hello"));
            }
            other => panic!("unexpected intent {:?}", other),
        }

        match parser.parse("message dk I'll be late").await {
            MessagingIntent::SendToAlias { alias, message, .. } => {
                assert_eq!(alias, "dk");
                assert_eq!(message.as_deref(), Some("I'll be late"));
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unregistered_relationship() {
        let parser = parser_with_mom().await;
        assert_eq!(
            parser.parse("send my wife a message").await,
            MessagingIntent::AliasNotFound("wife".into())
        );
        assert_eq!(
            parser.parse("text husband hi").await,
            MessagingIntent::AliasNotFound("husband".into())
        );
    }

    #[tokio::test]
    async fn test_numbers() {
        let parser = parser_with_mom().await;
        assert_eq!(
            parser.parse("send message to 0712123123").await,
            MessagingIntent::SendToNumber {
                number: "0712123123".into(),
                message: None
            }
        );
        assert_eq!(
            parser.parse("sms +254712123123 meeting at 5").await,
            MessagingIntent::SendToNumber {
                number: "+254712123123".into(),
                message: Some("meeting at 5".into())
            }
        );
    }

    #[tokio::test]
    async fn test_content_markers_and_missing_recipient() {
        let parser = parser_with_mom().await;
        assert_eq!(
            parser.parse("send a message").await,
            MessagingIntent::NeedRecipient(None)
        );
        assert_eq!(
            parser.parse("compose something saying see you soon").await,
            MessagingIntent::NeedRecipient(Some("see you soon".into()))
        );
        assert_eq!(
            parser.parse("open camera").await,
            MessagingIntent::NotAMessageCommand
        );
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message("send a message to bob that dinner is ready", Some("bob")),
            Some("dinner is ready".into())
        );
        assert_eq!(
            extract_message("text: running late", None),
            Some("running late".into())
        );
        assert_eq!(extract_message("send wife a text", Some("wife")), None);
        assert_eq!(extract_message("text mom", Some("mom")), None);
    }

    #[test]
    fn test_is_messaging_command() {
        assert!(is_messaging_command("Send a message"));
        assert!(is_messaging_command("msg bob hi"));
        assert!(!is_messaging_command("alias st=show time"));
        assert!(is_messaging_command("what messages do I have"));
        assert!(!is_messaging_command("call mom"));
    }
}
