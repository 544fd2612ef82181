use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::shortcuts::{self, call_target, extract_sim, is_generic_call, shortcut_code};
use super::state::{ActiveCallSession, CallAction, CallEndedInfo, CallState, format_duration};
use crate::alias::{AliasStore, suggested_alias};
use crate::carrier::CarrierAdapter;
use crate::config::CallingConfig;
use crate::contact::{Contact, ContactDirectory};
use crate::phone;
use crate::result::ShellOutput;
use crate::ussd::{UssdSessionManager, render_outcome};

const CONTROLS: &str = "X=End S=Spkr M=Mute";

/// Drives a calling conversation from the first `call ...` line to the end
/// of the call.
///
/// Target resolution order: service code, bare number, contact alias,
/// contact search. Every path ends at SIM selection, which is skipped when
/// the SIM was named inline or only one SIM is present.
pub struct CallingEngine {
    carrier: Arc<dyn CarrierAdapter>,
    aliases: AliasStore,
    contacts: Arc<dyn ContactDirectory>,
    ussd: Arc<Mutex<UssdSessionManager>>,
    search_limit: usize,
    state: CallState,
    active: Option<ActiveCallSession>,
    connected: bool,
    muted: bool,
    speaker: bool,
    on_hold: bool,
}

impl CallingEngine {
    pub fn new(
        carrier: Arc<dyn CarrierAdapter>,
        aliases: AliasStore,
        contacts: Arc<dyn ContactDirectory>,
        ussd: Arc<Mutex<UssdSessionManager>>,
        config: &CallingConfig,
    ) -> Self {
        Self {
            carrier,
            aliases,
            contacts,
            ussd,
            search_limit: config.contact_search_limit.max(1),
            state: CallState::Idle,
            active: None,
            connected: false,
            muted: false,
            speaker: false,
            on_hold: false,
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn active_call(&self) -> Option<&ActiveCallSession> {
        self.active.as_ref()
    }

    pub fn is_in_call(&self) -> bool {
        self.active.is_some()
    }

    /// True while a follow-up answer is expected.
    pub fn is_in_conversation(&self) -> bool {
        self.state.is_awaiting_input()
    }

    pub fn is_calling_command(&self, input: &str) -> bool {
        shortcuts::is_calling_command(input)
    }

    /// Abandons any pending question. An active call is left alone.
    pub fn reset(&mut self) {
        self.state = if self.active.is_some() {
            CallState::InCall
        } else {
            CallState::Idle
        };
    }

    // ------------------------------------------------------------------
    // New commands
    // ------------------------------------------------------------------

    /// Starts a calling conversation from a fresh line of input.
    pub async fn handle_command(&mut self, input: &str) -> Vec<ShellOutput> {
        let trimmed = input.trim();
        if let Some(code) = shortcut_code(trimmed) {
            let (sim, _) = extract_sim(trimmed);
            debug!(shortcut = %trimmed, code, "Service-code shortcut");
            return self.proceed_with_code(code, sim).await;
        }
        if is_generic_call(trimmed) {
            return self.open_method_menu();
        }
        match call_target(trimmed) {
            Some(target) if !target.is_empty() => self.handle_call_target(target).await,
            _ => vec![ShellOutput::error(
                "Unknown calling command. Try 'call <name/number>' or 'check balance'",
            )],
        }
    }

    async fn handle_call_target(&mut self, target: &str) -> Vec<ShellOutput> {
        let (sim, cleaned) = extract_sim(target);
        let cleaned = cleaned.to_lowercase();

        if phone::is_service_code(&cleaned) {
            return self.proceed_with_code(&cleaned, sim).await;
        }
        if phone::is_bare_number(&cleaned) {
            let number = phone::normalize_number(&cleaned);
            return self
                .proceed_with_call(&number, None, sim, vec![ShellOutput::info(format!("Calling: {}", number))])
                .await;
        }

        let alias_key = strip_filler(&cleaned);
        if let Some((number, name)) = self.lookup_alias(alias_key).await {
            let header = vec![
                ShellOutput::success(format!("Calling {} (alias: {})", name, alias_key)),
                ShellOutput::info(format!("Number: {}", number)),
            ];
            return self.proceed_with_call(&number, Some(name), sim, header).await;
        }

        let hits = self.search_contacts(&cleaned).await;
        match hits.as_slice() {
            [] => not_found_guidance(&cleaned, alias_key),
            [contact] => {
                let (number, name) = contact_target(contact);
                let header = vec![
                    ShellOutput::info(format!("Calling {}", name)),
                    ShellOutput::info(format!("Number: {}", number)),
                ];
                self.proceed_with_call(&number, Some(name), sim, header).await
            }
            _ => {
                let mut out = vec![ShellOutput::info(format!(
                    "Multiple contacts found for '{}':",
                    cleaned
                ))];
                out.extend(hits.iter().enumerate().map(|(i, c)| {
                    ShellOutput::info(format!(
                        "{}. {} - {}",
                        i + 1,
                        c.name,
                        c.primary_number().unwrap_or("")
                    ))
                }));
                out.push(ShellOutput::prompt("Enter number to select contact:"));
                self.state = CallState::AwaitingContactSelection {
                    contacts: hits,
                    sim,
                };
                out
            }
        }
    }

    fn open_method_menu(&mut self) -> Vec<ShellOutput> {
        self.state = CallState::AwaitingCallMethod;
        vec![
            ShellOutput::info("How would you like to make a call?"),
            ShellOutput::info("1. Enter phone number"),
            ShellOutput::info("2. Use alias"),
            ShellOutput::info("3. Choose from contacts"),
            ShellOutput::prompt("Enter your choice (1-3):"),
        ]
    }

    // ------------------------------------------------------------------
    // Follow-up answers
    // ------------------------------------------------------------------

    /// Consumes the answer to the last question asked.
    pub async fn handle_response(&mut self, input: &str) -> Vec<ShellOutput> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("cancel") && self.state.is_awaiting_input() {
            self.reset();
            return vec![ShellOutput::info("Call cancelled")];
        }
        match self.state.clone() {
            CallState::AwaitingCallMethod => self.handle_method_choice(trimmed),
            CallState::AwaitingNumberInput => self.handle_number_input(trimmed).await,
            CallState::AwaitingAliasInput => self.handle_alias_input(trimmed).await,
            CallState::AwaitingContactSelection { contacts, sim } => {
                self.handle_contact_selection(trimmed, &contacts, sim).await
            }
            CallState::AwaitingSimSelection(action) => {
                self.handle_sim_selection(trimmed, action).await
            }
            CallState::ShowContactModal => {
                self.state = CallState::Idle;
                self.handle_call_target(trimmed).await
            }
            CallState::Idle | CallState::InCall => {
                vec![ShellOutput::error("No active call session")]
            }
        }
    }

    fn handle_method_choice(&mut self, choice: &str) -> Vec<ShellOutput> {
        match choice {
            "1" => {
                self.state = CallState::AwaitingNumberInput;
                vec![ShellOutput::prompt("Enter phone number:")]
            }
            "2" => {
                self.state = CallState::AwaitingAliasInput;
                vec![ShellOutput::prompt("Enter alias name:")]
            }
            "3" => {
                self.state = CallState::ShowContactModal;
                vec![
                    ShellOutput::success("Opening contact selection..."),
                    ShellOutput::prompt("Type a name to search contacts:"),
                ]
            }
            _ => vec![ShellOutput::error("Invalid choice. Please enter 1, 2, or 3")],
        }
    }

    async fn handle_number_input(&mut self, input: &str) -> Vec<ShellOutput> {
        let number = phone::normalize_number(input);
        let digits = number.trim_start_matches('+').len();
        if (7..=15).contains(&digits) {
            let header = vec![ShellOutput::info(format!("Calling: {}", number))];
            self.proceed_with_call(&number, None, None, header).await
        } else {
            vec![ShellOutput::error(
                "Invalid phone number. Please enter a valid number:",
            )]
        }
    }

    async fn handle_alias_input(&mut self, input: &str) -> Vec<ShellOutput> {
        let lowered = input.to_lowercase();
        let alias_key = strip_filler(&lowered);
        if let Some((number, name)) = self.lookup_alias(alias_key).await {
            let header = vec![
                ShellOutput::success(format!("Calling {} (alias: {})", name, alias_key)),
                ShellOutput::info(format!("Number: {}", number)),
            ];
            return self.proceed_with_call(&number, Some(name), None, header).await;
        }
        match self.search_contacts(input).await.first() {
            Some(contact) => {
                let (number, name) = contact_target(contact);
                let header = vec![
                    ShellOutput::info(format!("Calling {}", name)),
                    ShellOutput::info(format!("Number: {}", number)),
                ];
                self.proceed_with_call(&number, Some(name), None, header).await
            }
            None => {
                self.state = CallState::Idle;
                vec![
                    ShellOutput::error(format!("No alias or contact found for '{}'", input)),
                    ShellOutput::info(format!(
                        "Set up an alias with: alias {} = <contact name>",
                        alias_key
                    )),
                ]
            }
        }
    }

    async fn handle_contact_selection(
        &mut self,
        choice: &str,
        contacts: &[Contact],
        sim: Option<usize>,
    ) -> Vec<ShellOutput> {
        match parse_index(choice, contacts.len()) {
            Some(index) => {
                let (number, name) = contact_target(&contacts[index]);
                let header = vec![
                    ShellOutput::info(format!("Calling {}", name)),
                    ShellOutput::info(format!("Number: {}", number)),
                ];
                self.proceed_with_call(&number, Some(name), sim, header).await
            }
            None => vec![ShellOutput::error(format!(
                "Invalid selection. Please enter a number between 1 and {}",
                contacts.len()
            ))],
        }
    }

    async fn handle_sim_selection(&mut self, choice: &str, action: CallAction) -> Vec<ShellOutput> {
        let sims = self.carrier.available_sims();
        let Some(slot) = parse_index(choice, sims.len().max(1)).map(|i| {
            sims.get(i).map(|s| s.slot).unwrap_or(i)
        }) else {
            return vec![ShellOutput::error(format!(
                "Invalid SIM selection. Please enter {}",
                sim_choices(sims.len())
            ))];
        };
        match action {
            CallAction::Call { number, name } => self.place(&number, name, slot).await,
            CallAction::ServiceCode(code) => self.run_service_code(&code, slot).await,
        }
    }

    // ------------------------------------------------------------------
    // Host picker entry points
    // ------------------------------------------------------------------

    /// Called when the host's contact picker returned a number.
    pub fn set_call_target(&mut self, number: &str, name: Option<String>) -> Vec<ShellOutput> {
        self.state = CallState::AwaitingSimSelection(CallAction::Call {
            number: number.to_string(),
            name,
        });
        self.sim_prompt(Vec::new())
    }

    /// Called when the host's picker already chose number and SIM.
    pub async fn place_call_directly(
        &mut self,
        number: &str,
        name: Option<String>,
        sim_slot: usize,
    ) -> Vec<ShellOutput> {
        self.place(number, name, sim_slot).await
    }

    // ------------------------------------------------------------------
    // Active call control
    // ------------------------------------------------------------------

    /// Handles input typed while a call is up.
    ///
    /// A new calling command ends the current call and starts over.
    pub async fn handle_call_control(&mut self, input: &str) -> Vec<ShellOutput> {
        if self.active.is_none() {
            return vec![ShellOutput::error("No active call session")];
        }
        if self.is_calling_command(input) {
            self.end_active_call().await;
            return self.handle_command(input).await;
        }

        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "x" | "end" | "hangup" | "cut" => match self.end_active_call().await {
                Some(ended) => vec![ShellOutput::info(ended.summary())],
                None => Vec::new(),
            },
            "s" | "speaker" => {
                self.speaker = !self.speaker;
                self.carrier.toggle_speaker(self.speaker).await;
                let status = format!("Speaker {}", if self.speaker { "ON" } else { "OFF" });
                self.call_line(&status)
            }
            "m" | "mute" => {
                self.muted = !self.muted;
                self.carrier.toggle_mute(self.muted).await;
                let status = format!("Mic {}", if self.muted { "MUTED" } else { "ON" });
                self.call_line(&status)
            }
            "h" | "hold" => {
                self.on_hold = !self.on_hold;
                let status = if self.on_hold { "On hold" } else { "Resumed" };
                self.call_line(status)
            }
            "?" | "help" => self.call_line(&format!("{} H=Hold 0-9=DTMF", CONTROLS)),
            _ if !trimmed.is_empty() && trimmed.chars().all(is_dtmf) => {
                for tone in trimmed.chars() {
                    if !self.carrier.send_dtmf(tone).await {
                        warn!(tone = %tone, "DTMF tone rejected");
                    }
                }
                self.call_line(&format!("Sent: {}", trimmed))
            }
            _ => self.call_line("Unknown. Press ? for help"),
        }
    }

    /// Ends the active call from this side.
    pub async fn end_active_call(&mut self) -> Option<CallEndedInfo> {
        let ended = self.finish_call()?;
        if let Err(e) = self.carrier.end_call().await {
            warn!(error = %e, "Carrier failed to end call");
        }
        info!(number = %ended.number, "Call ended");
        Some(ended)
    }

    /// The host saw the call connect.
    pub fn on_call_connected(&mut self) {
        if self.active.is_some() {
            self.connected = true;
            self.state = CallState::InCall;
        }
    }

    /// The far end hung up, or the call failed before connecting.
    pub fn on_remote_hangup(&mut self) -> Option<CallEndedInfo> {
        let ended = self.finish_call()?;
        debug!(number = %ended.number, connected = ended.connected, "Remote hangup");
        Some(ended)
    }

    fn finish_call(&mut self) -> Option<CallEndedInfo> {
        let session = self.active.take()?;
        let ended = CallEndedInfo {
            name: session.display_name().to_string(),
            number: session.phone_number.clone(),
            duration: session.duration(),
            connected: self.connected,
        };
        self.state = CallState::Idle;
        self.connected = false;
        self.muted = false;
        self.speaker = false;
        self.on_hold = false;
        Some(ended)
    }

    fn call_line(&self, status: &str) -> Vec<ShellOutput> {
        let Some(session) = &self.active else {
            return Vec::new();
        };
        let mut flags = String::new();
        if self.speaker {
            flags.push_str("[SPK] ");
        }
        if self.muted {
            flags.push_str("[MUTE] ");
        }
        if self.on_hold {
            flags.push_str("[HOLD] ");
        }
        vec![ShellOutput::success(format!(
            "{} [{}] {}| {} -> {}",
            session.display_name(),
            format_duration(session.duration()),
            flags,
            CONTROLS,
            status
        ))]
    }

    // ------------------------------------------------------------------
    // Shared paths
    // ------------------------------------------------------------------

    async fn proceed_with_call(
        &mut self,
        number: &str,
        name: Option<String>,
        sim: Option<usize>,
        header: Vec<ShellOutput>,
    ) -> Vec<ShellOutput> {
        if let Some(slot) = sim.or_else(|| self.single_sim()) {
            return self.place(number, name, slot).await;
        }
        self.state = CallState::AwaitingSimSelection(CallAction::Call {
            number: number.to_string(),
            name,
        });
        self.sim_prompt(header)
    }

    async fn proceed_with_code(&mut self, code: &str, sim: Option<usize>) -> Vec<ShellOutput> {
        if let Some(slot) = sim.or_else(|| self.single_sim()) {
            return self.run_service_code(code, slot).await;
        }
        self.state = CallState::AwaitingSimSelection(CallAction::ServiceCode(code.to_string()));
        self.sim_prompt(vec![ShellOutput::info(format!("USSD: {}", code))])
    }

    async fn place(&mut self, number: &str, name: Option<String>, slot: usize) -> Vec<ShellOutput> {
        if let Err(e) = self.carrier.place_call(number, slot).await {
            warn!(number, error = %e, "Failed to place call");
            self.state = CallState::Idle;
            return vec![ShellOutput::error(format!("Call failed: {}", e))];
        }
        info!(number, sim_slot = slot, "Call placed");
        let session = ActiveCallSession::new(number, name, slot);
        let line = format!(
            "Calling {} (SIM {})... | {}",
            session.display_name(),
            slot + 1,
            CONTROLS
        );
        self.active = Some(session);
        self.connected = false;
        self.muted = false;
        self.speaker = false;
        self.on_hold = false;
        self.state = CallState::InCall;
        vec![ShellOutput::success(line)]
    }

    async fn run_service_code(&mut self, code: &str, slot: usize) -> Vec<ShellOutput> {
        self.reset();
        let result = self.ussd.lock().await.execute(code, slot, false).await;
        render_outcome(&result)
    }

    fn single_sim(&self) -> Option<usize> {
        let sims = self.carrier.available_sims();
        if sims.len() <= 1 {
            Some(sims.first().map(|s| s.slot).unwrap_or(0))
        } else {
            None
        }
    }

    fn sim_prompt(&self, mut header: Vec<ShellOutput>) -> Vec<ShellOutput> {
        let sims = self.carrier.available_sims();
        header.extend(
            sims.iter()
                .enumerate()
                .map(|(i, sim)| ShellOutput::info(format!("{}. {}", i + 1, sim.label))),
        );
        header.push(ShellOutput::prompt(format!(
            "Select SIM ({}):",
            sim_choices(sims.len())
        )));
        header
    }

    async fn lookup_alias(&self, alias: &str) -> Option<(String, String)> {
        match self.aliases.get(alias).await {
            Ok(Some(alias)) if !alias.phone_number.is_empty() => {
                Some((alias.phone_number, alias.contact_name))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(alias, error = %e, "Alias lookup failed");
                None
            }
        }
    }

    async fn search_contacts(&self, query: &str) -> Vec<Contact> {
        match self.contacts.search(query, self.search_limit).await {
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

fn strip_filler(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("my ")
        .or_else(|| text.strip_prefix("to "))
        .unwrap_or(text)
        .trim()
}

fn contact_target(contact: &Contact) -> (String, String) {
    (
        contact.primary_number().unwrap_or_default().to_string(),
        contact.name.clone(),
    )
}

fn is_dtmf(c: char) -> bool {
    c.is_ascii_digit() || c == '*' || c == '#'
}

/// Parses a 1-based menu choice into a 0-based index.
pub(crate) fn parse_index(choice: &str, len: usize) -> Option<usize> {
    choice
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

fn sim_choices(count: usize) -> String {
    match count {
        0 | 1 => "1".to_string(),
        2 => "1 or 2".to_string(),
        n => format!("1-{}", n),
    }
}

fn not_found_guidance(query: &str, alias_key: &str) -> Vec<ShellOutput> {
    if suggested_alias(alias_key).is_some() {
        vec![
            ShellOutput::warning(format!("Alias '{}' is not set up yet", alias_key)),
            ShellOutput::info(format!(
                "Set it up with: alias {} = <contact name>",
                alias_key
            )),
            ShellOutput::info("Or use 'call <phone number>' to dial directly"),
        ]
    } else {
        vec![
            ShellOutput::error(format!("No contact found for '{}'", query)),
            ShellOutput::info("Tip: Use 'call <phone number>' to dial directly"),
            ShellOutput::info(format!(
                "Or set up an alias: alias {} = <contact name>",
                alias_key
            )),
        ]
    }
}
