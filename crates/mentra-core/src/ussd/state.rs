use chrono::{DateTime, Utc};
use serde::Serialize;

/// A carrier response to a service code or menu reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UssdResponse {
    /// The code that opened the session.
    pub code: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_interactive: bool,
    pub session_active: bool,
}

/// Where the service-code session currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum UssdState {
    Idle,
    Executing(String),
    Interactive(UssdResponse),
    Success(UssdResponse),
    Error(String),
    /// The code was handed to the system dialer; no response will arrive.
    LegacyDialing(String),
}

impl UssdState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive(_))
    }
}

/// Successful completion of [`super::UssdSessionManager::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UssdOutcome {
    Response(UssdResponse),
    LegacyDial(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UssdHistoryEntry {
    pub code: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

impl UssdHistoryEntry {
    pub fn formatted_time(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string()
    }
}
