use std::sync::Arc;
use tracing::{debug, info, warn};

use super::intent::{self, IntentParser, MessagingIntent};
use super::state::{ConversationState, OpenThread, PendingMessage, SelectionPurpose};
use super::store::MessageStore;
use crate::alias::AliasStore;
use crate::calling::parse_index;
use crate::carrier::{CarrierAdapter, SendOutcome};
use crate::config::MessagingConfig;
use crate::contact::{Contact, ContactDirectory};
use crate::phone;
use crate::result::{OutputKind, ShellOutput};

const RECIPIENT_MENU: &str = "To? (1=number, 2=contacts, 3=alias, 4=cancel)";
const INVALID_NUMBER_HINT: &str = "Please enter a valid number (7-15 digits, can start with +):";
const CONFIRM_PROMPT: &str = "Send this message? (yes/no)";

/// Drives sending a text from a free-form line to the carrier, plus the
/// inbox, quick-reply and contact-alias commands.
///
/// One message is assembled at a time; its recipient and body live in the
/// pending slot until the message is sent or the conversation is reset.
/// The open quick-reply thread is kept separately and survives both.
pub struct MessagingEngine {
    pub(super) carrier: Arc<dyn CarrierAdapter>,
    pub(super) aliases: AliasStore,
    pub(super) contacts: Arc<dyn ContactDirectory>,
    pub(super) store: Arc<dyn MessageStore>,
    pub(super) config: MessagingConfig,
    parser: IntentParser,
    pub(super) state: ConversationState,
    pub(super) pending: PendingMessage,
    pub(super) open_thread: Option<OpenThread>,
}

impl MessagingEngine {
    pub fn new(
        carrier: Arc<dyn CarrierAdapter>,
        aliases: AliasStore,
        contacts: Arc<dyn ContactDirectory>,
        store: Arc<dyn MessageStore>,
        config: &MessagingConfig,
    ) -> Self {
        Self {
            carrier,
            parser: IntentParser::new(aliases.clone()),
            aliases,
            contacts,
            store,
            config: config.clone(),
            state: ConversationState::None,
            pending: PendingMessage::default(),
            open_thread: None,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// True while a follow-up answer is expected.
    pub fn is_in_conversation(&self) -> bool {
        self.state.is_active()
    }

    pub fn open_thread(&self) -> Option<&OpenThread> {
        self.open_thread.as_ref()
    }

    pub fn is_messaging_command(&self, input: &str) -> bool {
        intent::is_messaging_command(input)
    }

    /// True for lines this engine owns outright: a pending answer, the
    /// inbox and quick-reply commands, and contact-alias commands.
    pub fn handles(&self, input: &str) -> bool {
        self.is_in_conversation() || Self::is_inbox_command(input) || Self::is_alias_command(input)
    }

    /// Drops the message being assembled. The open thread is kept.
    pub fn reset(&mut self) {
        self.state = ConversationState::None;
        self.pending = PendingMessage::default();
    }

    /// Handles one line of input, whatever state the conversation is in.
    pub async fn handle_command(&mut self, input: &str) -> Vec<ShellOutput> {
        let trimmed = input.trim();
        if self.state.is_active() {
            return self.handle_response(trimmed).await;
        }
        if let Some(out) = self.handle_alias_command(trimmed).await {
            return out;
        }
        if let Some(out) = self.handle_inbox_command(trimmed).await {
            return out;
        }
        self.handle_intent(trimmed).await
    }

    /// Starts a send flow when the line parses as one. Returns `None` for
    /// lines that only looked like messaging, so the caller can route them on.
    pub async fn try_start(&mut self, input: &str) -> Option<Vec<ShellOutput>> {
        let intent = self.parser.parse(input.trim()).await;
        if intent == MessagingIntent::NotAMessageCommand {
            debug!(input, "Line is not a send request");
            return None;
        }
        Some(self.run_intent(intent).await)
    }

    async fn handle_intent(&mut self, input: &str) -> Vec<ShellOutput> {
        let intent = self.parser.parse(input).await;
        self.run_intent(intent).await
    }

    async fn run_intent(&mut self, intent: MessagingIntent) -> Vec<ShellOutput> {
        debug!(?intent, "Parsed messaging intent");
        match intent {
            MessagingIntent::NotAMessageCommand => vec![ShellOutput::error(
                "Not a messaging command. Try 'text <name> <message>'",
            )],
            MessagingIntent::SendToAlias {
                alias,
                contact,
                message,
            } => {
                let number = contact.primary_number().unwrap_or_default().to_string();
                let mut out = vec![ShellOutput::info(format!(
                    "📱 Sending to {} ({})",
                    alias, contact.name
                ))];
                self.pending = PendingMessage {
                    recipient: Some(number),
                    recipient_name: Some(contact.name),
                    body: message,
                    alias: None,
                };
                out.extend(self.continue_flow("Message:").await);
                out
            }
            MessagingIntent::SendToNumber { number, message } => {
                let mut out = vec![ShellOutput::info(format!("📱 To: {}", number))];
                self.pending = PendingMessage {
                    recipient: Some(number),
                    recipient_name: None,
                    body: message,
                    alias: None,
                };
                out.extend(self.continue_flow("Message:").await);
                out
            }
            MessagingIntent::AliasNotFound(alias) => {
                let prompt = format!(
                    "\"{}\" not set. Setup? (1=contacts, 2=number, 3=cancel)",
                    alias
                );
                self.pending = PendingMessage {
                    alias: Some(alias),
                    ..PendingMessage::default()
                };
                self.state = ConversationState::AwaitingAliasSelection;
                vec![ShellOutput::prompt(prompt)]
            }
            MessagingIntent::InvalidNumber(number) => {
                vec![ShellOutput::error(format!("❌ Invalid number: {}", number))]
            }
            MessagingIntent::NeedRecipient(message) => {
                self.pending = PendingMessage {
                    body: message,
                    ..PendingMessage::default()
                };
                self.state = ConversationState::AwaitingRecipientChoice;
                vec![ShellOutput::prompt(RECIPIENT_MENU)]
            }
        }
    }

    // ------------------------------------------------------------------
    // Answers
    // ------------------------------------------------------------------

    async fn handle_response(&mut self, input: &str) -> Vec<ShellOutput> {
        if input.eq_ignore_ascii_case("cancel") {
            let message = if self.pending.alias.is_some() {
                "Alias setup cancelled."
            } else {
                "Cancelled."
            };
            self.reset();
            return vec![ShellOutput::info(message)];
        }

        match self.state.clone() {
            ConversationState::None => self.handle_intent(input).await,
            ConversationState::AwaitingRecipientChoice => self.handle_recipient_choice(input).await,
            ConversationState::AwaitingPhoneNumber => self.handle_phone_number(input).await,
            ConversationState::AwaitingMessageBody => self.handle_message_body(input).await,
            ConversationState::AwaitingConfirmation => self.handle_confirmation(input).await,
            ConversationState::AwaitingAliasSelection => self.handle_alias_selection(input),
            ConversationState::AwaitingAliasPhoneNumber => self.handle_alias_phone_number(input).await,
            ConversationState::AwaitingContactPick => self.handle_contact_search(input).await,
            ConversationState::AwaitingContactListSelection {
                candidates,
                purpose,
            } => match parse_index(input, candidates.len()) {
                Some(index) => {
                    let contact = candidates[index].clone();
                    let number = contact.primary_number().unwrap_or_default().to_string();
                    self.select_contact(contact, number, purpose).await
                }
                None => vec![ShellOutput::prompt(format!(
                    "Please enter 1-{} or 'cancel':",
                    candidates.len()
                ))],
            },
            ConversationState::AwaitingThreadSelection { candidates, count } => {
                match parse_index(input, candidates.len()) {
                    Some(index) => {
                        let thread = &candidates[index];
                        self.state = ConversationState::None;
                        self.show_thread(&thread.address, thread.contact_name.clone(), count)
                            .await
                    }
                    None => vec![ShellOutput::prompt(format!(
                        "Please enter 1-{} or 'cancel':",
                        candidates.len()
                    ))],
                }
            }
            ConversationState::Sending => {
                vec![ShellOutput::warning("Still sending the previous message")]
            }
        }
    }

    async fn handle_recipient_choice(&mut self, input: &str) -> Vec<ShellOutput> {
        match input.to_lowercase().as_str() {
            "1" | "number" => {
                self.state = ConversationState::AwaitingPhoneNumber;
                vec![ShellOutput::prompt("Number:")]
            }
            "2" | "contacts" | "contact" => {
                self.state = ConversationState::AwaitingContactPick;
                vec![
                    ShellOutput::info("Opening contacts..."),
                    ShellOutput::prompt("Type a name to search contacts:"),
                ]
            }
            "3" | "alias" => vec![ShellOutput::prompt("Alias:")],
            "4" => {
                self.reset();
                vec![ShellOutput::info("Cancelled.")]
            }
            "" => vec![ShellOutput::prompt(RECIPIENT_MENU)],
            _ if phone::looks_like_phone_input(input) => self.handle_phone_number(input).await,
            _ => self.resolve_recipient_text(input).await,
        }
    }

    /// Alias first, then a contact search.
    async fn resolve_recipient_text(&mut self, input: &str) -> Vec<ShellOutput> {
        if let Ok(Some(alias)) = self.aliases.get(input).await {
            if !alias.phone_number.is_empty() {
                let number = alias.phone_number.clone();
                return self
                    .select_contact(alias.to_contact(), number, SelectionPurpose::Recipient)
                    .await;
            }
        }
        self.handle_contact_search(input).await
    }

    async fn handle_contact_search(&mut self, input: &str) -> Vec<ShellOutput> {
        if input.is_empty() {
            return vec![ShellOutput::prompt("Type a name to search contacts:")];
        }
        let purpose = match &self.pending.alias {
            Some(alias) => SelectionPurpose::Alias(alias.clone()),
            None => SelectionPurpose::Recipient,
        };
        if purpose == SelectionPurpose::Recipient && phone::is_bare_number(input) {
            return self.handle_phone_number(input).await;
        }

        let mut hits = self.search_contacts(input).await;
        if hits.len() > 1 {
            let header = format!("Found {} contacts:", hits.len());
            return self.offer_contacts(hits, purpose, header);
        }
        match hits.pop() {
            Some(contact) => {
                let number = contact.primary_number().unwrap_or_default().to_string();
                self.select_contact(contact, number, purpose).await
            }
            None => vec![
                ShellOutput::error(format!("❌ No contact found for \"{}\"", input)),
                ShellOutput::prompt("Try entering a phone number or search again:"),
            ],
        }
    }

    async fn handle_phone_number(&mut self, input: &str) -> Vec<ShellOutput> {
        let cleaned: String = input.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if !phone::is_valid_phone_number(&cleaned) {
            return vec![
                ShellOutput::error("❌ Invalid phone number format"),
                ShellOutput::prompt(INVALID_NUMBER_HINT),
            ];
        }
        self.pending.recipient = Some(cleaned.clone());
        self.pending.recipient_name = None;
        let mut out = vec![ShellOutput::info(format!("To: {}", cleaned))];
        out.extend(self.continue_flow("Message:").await);
        out
    }

    async fn handle_message_body(&mut self, input: &str) -> Vec<ShellOutput> {
        if input.is_empty() {
            return vec![
                ShellOutput::error("❌ Empty message"),
                ShellOutput::prompt("Message:"),
            ];
        }
        self.pending.body = Some(input.to_string());
        self.continue_flow("Message:").await
    }

    async fn handle_confirmation(&mut self, input: &str) -> Vec<ShellOutput> {
        match input.to_lowercase().as_str() {
            "" | "yes" | "y" | "send" | "ok" | "confirm" => self.send_pending().await,
            "no" | "n" => {
                self.reset();
                vec![ShellOutput::info("Cancelled.")]
            }
            "edit" | "e" | "change" => {
                self.pending.body = None;
                self.state = ConversationState::AwaitingMessageBody;
                vec![ShellOutput::prompt("Enter new message:")]
            }
            _ => vec![ShellOutput::prompt(
                "Please enter 'yes' to send, 'no' to cancel, or 'edit' to change message:",
            )],
        }
    }

    fn handle_alias_selection(&mut self, input: &str) -> Vec<ShellOutput> {
        let alias = self.pending.alias.clone().unwrap_or_default();
        match input {
            "1" => {
                self.state = ConversationState::AwaitingContactPick;
                vec![ShellOutput::prompt(format!(
                    "Search contacts for \"{}\":",
                    alias
                ))]
            }
            "2" => {
                self.state = ConversationState::AwaitingAliasPhoneNumber;
                vec![ShellOutput::prompt(format!(
                    "Enter phone number for \"{}\":",
                    alias
                ))]
            }
            "3" => {
                self.reset();
                vec![ShellOutput::info("Alias setup cancelled.")]
            }
            _ => vec![ShellOutput::prompt("Please enter 1, 2, or 3:")],
        }
    }

    async fn handle_alias_phone_number(&mut self, input: &str) -> Vec<ShellOutput> {
        let cleaned: String = input.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if !phone::is_valid_phone_number(&cleaned) {
            return vec![
                ShellOutput::error("❌ Invalid phone number format"),
                ShellOutput::prompt(INVALID_NUMBER_HINT),
            ];
        }
        let alias = self.pending.alias.clone().unwrap_or_default();
        let contact = Contact::new("", cleaned.clone(), cleaned.clone());
        self.select_contact(contact, cleaned, SelectionPurpose::Alias(alias))
            .await
    }

    // ------------------------------------------------------------------
    // Host picker entry points
    // ------------------------------------------------------------------

    /// Called when the host's contact picker returned a contact.
    pub async fn on_contact_selected(&mut self, contact: &Contact, number: &str) -> Vec<ShellOutput> {
        if self.state != ConversationState::AwaitingContactPick {
            warn!(state = ?self.state, "Contact picked outside a pick prompt");
            return Vec::new();
        }
        let purpose = match &self.pending.alias {
            Some(alias) => SelectionPurpose::Alias(alias.clone()),
            None => SelectionPurpose::Recipient,
        };
        self.select_contact(contact.clone(), number.to_string(), purpose)
            .await
    }

    /// Called when the host's contact picker was dismissed.
    pub fn on_contact_picker_cancelled(&mut self) -> Vec<ShellOutput> {
        self.reset();
        vec![ShellOutput::info("Cancelled.")]
    }

    // ------------------------------------------------------------------
    // Shared steps
    // ------------------------------------------------------------------

    /// Applies a chosen contact according to why it was asked for.
    ///
    /// A contact bound to a bare number carries the number as its name.
    pub(super) async fn select_contact(
        &mut self,
        contact: Contact,
        number: String,
        purpose: SelectionPurpose,
    ) -> Vec<ShellOutput> {
        let named = contact.name != number;
        match purpose {
            SelectionPurpose::Recipient => {
                let mut out = vec![ShellOutput::success(format!(
                    "✓ Found: {} ({})",
                    contact.name, number
                ))];
                self.pending.recipient = Some(number);
                self.pending.recipient_name = Some(contact.name);
                out.extend(self.continue_flow("Enter your message:").await);
                out
            }
            SelectionPurpose::Alias(alias) => {
                let saved = self.save_alias(&alias, &contact, &number).await;
                let ok = saved.kind != OutputKind::Error;
                let mut out = vec![saved];
                if ok && self.pending.alias.take().is_some() {
                    self.pending.recipient = Some(number);
                    self.pending.recipient_name = named.then_some(contact.name);
                    out.extend(self.continue_flow("Message:").await);
                } else {
                    self.reset();
                }
                out
            }
            SelectionPurpose::Read(count) => {
                self.state = ConversationState::None;
                let name = named.then_some(contact.name);
                self.show_thread(&number, name, count).await
            }
        }
    }

    /// Puts a numbered contact list on screen.
    pub(super) fn offer_contacts(
        &mut self,
        contacts: Vec<Contact>,
        purpose: SelectionPurpose,
        header: String,
    ) -> Vec<ShellOutput> {
        let mut out = vec![ShellOutput::info(header)];
        out.extend(contacts.iter().enumerate().map(|(i, c)| {
            ShellOutput::info(format!(
                "  {}. {} ({})",
                i + 1,
                c.name,
                c.primary_number().unwrap_or_default()
            ))
        }));
        out.push(ShellOutput::prompt(format!(
            "Enter number to select (1-{}):",
            contacts.len()
        )));
        self.state = ConversationState::AwaitingContactListSelection {
            candidates: contacts,
            purpose,
        };
        out
    }

    /// Moves to whichever step is missing, or sends.
    async fn continue_flow(&mut self, body_prompt: &str) -> Vec<ShellOutput> {
        match (&self.pending.recipient, &self.pending.body) {
            (None, _) => {
                self.state = ConversationState::AwaitingRecipientChoice;
                vec![ShellOutput::prompt(RECIPIENT_MENU)]
            }
            (Some(_), None) => {
                self.state = ConversationState::AwaitingMessageBody;
                vec![ShellOutput::prompt(body_prompt.to_string())]
            }
            (Some(_), Some(body)) if self.config.confirm_before_send => {
                let out = vec![
                    ShellOutput::info(format!("To: {}", self.pending.display_recipient())),
                    ShellOutput::info(format!("Message: {}", body)),
                    ShellOutput::prompt(CONFIRM_PROMPT),
                ];
                self.state = ConversationState::AwaitingConfirmation;
                out
            }
            (Some(_), Some(_)) => self.send_pending().await,
        }
    }

    async fn send_pending(&mut self) -> Vec<ShellOutput> {
        let (Some(number), Some(body)) = (self.pending.recipient.clone(), self.pending.body.clone())
        else {
            self.reset();
            return vec![ShellOutput::error("❌ Nothing to send")];
        };
        let name = self.pending.display_recipient();
        self.state = ConversationState::Sending;
        let out = vec![self.deliver(&number, &body, &name).await];
        self.reset();
        out
    }

    /// Sends one text and records it on success.
    pub(super) async fn deliver(&self, number: &str, body: &str, name: &str) -> ShellOutput {
        let outcome = self
            .carrier
            .send_text(number, body, self.config.default_sim)
            .await;
        match outcome {
            SendOutcome::Success => {
                info!(to = number, "Message sent");
                if let Err(e) = self.store.record_sent(number, body).await {
                    warn!(error = %e, "Failed to record sent message");
                }
                ShellOutput::success(format!("✅ Sent to {}", name))
            }
            SendOutcome::InvalidNumber => ShellOutput::error("❌ Invalid number"),
            SendOutcome::EmptyMessage => ShellOutput::error("❌ Empty message"),
            SendOutcome::Failed(reason) => {
                warn!(to = number, %reason, "Message send failed");
                ShellOutput::error(format!("❌ Failed: {}", reason))
            }
        }
    }

    pub(super) async fn search_contacts(&self, query: &str) -> Vec<Contact> {
        match self
            .contacts
            .search(query, self.config.contact_search_limit.max(1))
            .await
        {
            Ok(hits) => hits
                .into_iter()
                .filter(|c| c.primary_number().is_some())
                .collect(),
            Err(e) => {
                warn!(query, error = %e, "Contact search failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::alias::{ContactAlias, InMemoryContactAliasRepository};
    use crate::messaging::ShellMessage;
    use crate::testing::{FixedContacts, MemoryMessageStore, RecordingCarrier};
    use pretty_assertions::assert_eq;

    pub(crate) struct Fixture {
        pub engine: MessagingEngine,
        pub carrier: Arc<RecordingCarrier>,
        pub aliases: AliasStore,
        pub store: Arc<MemoryMessageStore>,
    }

    pub(crate) fn fixture_with(config: MessagingConfig, messages: Vec<ShellMessage>) -> Fixture {
        let carrier = Arc::new(RecordingCarrier::new(2));
        let aliases = AliasStore::new(Arc::new(InMemoryContactAliasRepository::new()));
        let store = Arc::new(MemoryMessageStore::with_messages(messages));
        let engine = MessagingEngine::new(
            carrier.clone(),
            aliases.clone(),
            Arc::new(FixedContacts::sample()),
            store.clone(),
            &config,
        );
        Fixture {
            engine,
            carrier,
            aliases,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MessagingConfig::default(), Vec::new())
    }

    fn texts(out: &[ShellOutput]) -> Vec<&str> {
        out.iter().map(|o| o.text.as_str()).collect()
    }

    fn has_prompt(out: &[ShellOutput]) -> bool {
        out.iter().any(|o| o.kind == OutputKind::Prompt)
    }

    #[tokio::test]
    async fn test_alias_with_body_sends_without_prompts() {
        let mut f = fixture();
        let jane = Contact::new("c1", "Jane", "+15550001111");
        f.aliases
            .set_alias(ContactAlias::for_contact("mom", &jane, "+15550001111"))
            .await
            .unwrap();

        let out = f.engine.handle_command("text mom hello").await;
        assert!(!has_prompt(&out));
        assert_eq!(texts(&out), vec!["📱 Sending to mom (Jane)", "✅ Sent to Jane"]);
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550001111".to_string(), "hello".to_string(), 0)]
        );
        assert_eq!(f.engine.state(), &ConversationState::None);
        assert_eq!(f.store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_need_recipient_then_contacts_then_body() {
        let mut f = fixture();
        let out = f.engine.handle_command("send a message").await;
        assert_eq!(texts(&out), vec![RECIPIENT_MENU]);

        f.engine.handle_command("2").await;
        assert_eq!(f.engine.state(), &ConversationState::AwaitingContactPick);

        let out = f.engine.handle_command("doe").await;
        assert_eq!(out[0].text, "Found 2 contacts:");
        assert_eq!(out[1].text, "  1. Jane Doe (+15550001111)");
        assert_eq!(out.last().unwrap().text, "Enter number to select (1-2):");

        let out = f.engine.handle_command("1").await;
        assert_eq!(
            texts(&out),
            vec!["✓ Found: Jane Doe (+15550001111)", "Enter your message:"]
        );
        assert!(f.carrier.texts().is_empty());

        f.engine.handle_command("see you at 5").await;
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550001111".to_string(), "see you at 5".to_string(), 0)]
        );
        assert!(!f.engine.is_in_conversation());
    }

    #[tokio::test]
    async fn test_need_recipient_keeps_supplied_body() {
        let mut f = fixture();
        f.engine
            .handle_command("send a message saying running late")
            .await;
        f.engine.handle_command("2").await;
        let out = f.engine.handle_command("bob").await;
        assert_eq!(out.last().unwrap().text, "✅ Sent to Bob Builder");
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550003333".to_string(), "running late".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_number_menu_validates() {
        let mut f = fixture();
        f.engine.handle_command("compose").await;
        f.engine.handle_command("1").await;
        let out = f.engine.handle_command("12ab").await;
        assert_eq!(texts(&out), vec!["❌ Invalid phone number format", INVALID_NUMBER_HINT]);

        let out = f.engine.handle_command("0712 345-678").await;
        assert_eq!(texts(&out), vec!["To: 0712345678", "Message:"]);
        let out = f.engine.handle_command("").await;
        assert_eq!(texts(&out), vec!["❌ Empty message", "Message:"]);
        f.engine.handle_command("hi").await;
        assert_eq!(f.carrier.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_alias_setup_by_number_then_send() {
        let mut f = fixture();
        let out = f.engine.handle_command("text wife hi").await;
        assert_eq!(
            texts(&out),
            vec!["\"wife\" not set. Setup? (1=contacts, 2=number, 3=cancel)"]
        );
        let out = f.engine.handle_command("9").await;
        assert_eq!(texts(&out), vec!["Please enter 1, 2, or 3:"]);

        let out = f.engine.handle_command("2").await;
        assert_eq!(texts(&out), vec!["Enter phone number for \"wife\":"]);

        let out = f.engine.handle_command("0712345678").await;
        assert_eq!(
            texts(&out),
            vec!["✓ Alias \"wife\" set to 0712345678", "Message:"]
        );
        f.engine.handle_command("home soon").await;
        assert_eq!(
            f.carrier.texts(),
            vec![("0712345678".to_string(), "home soon".to_string(), 0)]
        );
        assert!(f.aliases.has_alias("wife").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_alias_setup_cancel() {
        let mut f = fixture();
        f.engine.handle_command("send my boss a message").await;
        let out = f.engine.handle_command("cancel").await;
        assert_eq!(texts(&out), vec!["Alias setup cancelled."]);
        assert!(!f.engine.is_in_conversation());
    }

    #[tokio::test]
    async fn test_unknown_alias_setup_by_contact() {
        let mut f = fixture();
        f.engine.handle_command("text my sister").await;
        f.engine.handle_command("1").await;
        let out = f.engine.handle_command("mary").await;
        assert_eq!(out[0].text, "✓ Alias \"sister\" set to Mary Jane (+254712345678)");
        assert_eq!(out[1].text, "Message:");
        f.engine.handle_command("hey").await;
        assert_eq!(f.carrier.texts()[0].0, "+254712345678");
    }

    #[tokio::test]
    async fn test_confirmation_edit_and_send() {
        let config = MessagingConfig {
            confirm_before_send: true,
            ..MessagingConfig::default()
        };
        let mut f = fixture_with(config, Vec::new());
        let out = f.engine.handle_command("sms 0712345678 hello").await;
        assert_eq!(out.last().unwrap().text, CONFIRM_PROMPT);
        assert_eq!(f.engine.state(), &ConversationState::AwaitingConfirmation);

        let out = f.engine.handle_command("maybe").await;
        assert!(out[0].text.starts_with("Please enter 'yes'"));
        let out = f.engine.handle_command("edit").await;
        assert_eq!(texts(&out), vec!["Enter new message:"]);
        let out = f.engine.handle_command("goodbye").await;
        assert_eq!(out.last().unwrap().text, CONFIRM_PROMPT);
        f.engine.handle_command("yes").await;
        assert_eq!(
            f.carrier.texts(),
            vec![("0712345678".to_string(), "goodbye".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let mut f = fixture();
        f.carrier
            .set_send_outcome(SendOutcome::Failed("No service".into()));
        let out = f.engine.handle_command("text 0712345678 hi").await;
        assert_eq!(out.last().unwrap().text, "❌ Failed: No service");
        assert!(f.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_choice_search_miss_stays_in_menu() {
        let mut f = fixture();
        f.engine.handle_command("send message").await;
        let out = f.engine.handle_command("zed").await;
        assert_eq!(
            texts(&out),
            vec![
                "❌ No contact found for \"zed\"",
                "Try entering a phone number or search again:"
            ]
        );
        assert_eq!(f.engine.state(), &ConversationState::AwaitingRecipientChoice);
    }

    #[tokio::test]
    async fn test_try_start_passes_on_non_send_lines() {
        let mut f = fixture();
        assert!(f.engine.try_start("open messages").await.is_none());
        assert_eq!(f.engine.state(), &ConversationState::None);

        let out = f.engine.try_start("send message").await.unwrap();
        assert!(has_prompt(&out));
        assert_eq!(f.engine.state(), &ConversationState::AwaitingRecipientChoice);
    }

    #[tokio::test]
    async fn test_host_picker_selection() {
        let mut f = fixture();
        f.engine.handle_command("send a message saying ping").await;
        f.engine.handle_command("2").await;
        let john = Contact::new("c2", "John Doe", "+15550002222");
        f.engine.on_contact_selected(&john, "+15550002222").await;
        assert_eq!(f.carrier.texts()[0].1, "ping");
    }
}
