use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::contact::Contact;

/// What to do once a SIM has been chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CallAction {
    Call { number: String, name: Option<String> },
    ServiceCode(String),
}

/// Where the calling conversation is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CallState {
    Idle,
    InCall,
    AwaitingCallMethod,
    AwaitingNumberInput,
    AwaitingAliasInput,
    /// `sim` carries a SIM named inline in the original command.
    AwaitingContactSelection {
        contacts: Vec<Contact>,
        sim: Option<usize>,
    },
    AwaitingSimSelection(CallAction),
    /// The host should show its contact picker; typed input is searched.
    ShowContactModal,
}

impl CallState {
    /// True while the engine expects the next line as an answer.
    pub fn is_awaiting_input(&self) -> bool {
        !matches!(self, CallState::Idle | CallState::InCall)
    }
}

/// A call placed from the shell, alive until either side hangs up.
#[derive(Debug, Clone)]
pub struct ActiveCallSession {
    pub phone_number: String,
    pub contact_name: Option<String>,
    pub sim_slot: usize,
    pub start_time: Instant,
}

impl ActiveCallSession {
    pub fn new(phone_number: &str, contact_name: Option<String>, sim_slot: usize) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            contact_name,
            sim_slot,
            start_time: Instant::now(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.contact_name.as_deref().unwrap_or(&self.phone_number)
    }

    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Reported when a call ends on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEndedInfo {
    pub name: String,
    pub number: String,
    pub duration: Duration,
    /// False when the call never connected (rejected or unanswered).
    pub connected: bool,
}

impl CallEndedInfo {
    pub fn summary(&self) -> String {
        format!("Call ended: {} [{}]", self.name, format_duration(self.duration))
    }
}

/// `mm:ss`, or `hh:mm:ss` past the first hour.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
