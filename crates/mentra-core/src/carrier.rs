//! Contract for the host telephony subsystem.
//!
//! The shell never talks to a modem directly. Everything that leaves the
//! process (calls, tones, texts, service codes) goes through a
//! [`CarrierAdapter`] supplied by the host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ShellError};

/// Carrier failure code for a request the network rejected.
pub const USSD_RETURN_FAILURE: i32 = -1;
/// Carrier failure code for a subsystem that cannot serve requests.
pub const USSD_ERROR_SERVICE_UNAVAIL: i32 = -2;

/// An installed SIM as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimInfo {
    /// Zero-based slot index.
    pub slot: usize,
    /// Carrier or user-facing label, e.g. "Safaricom".
    pub label: String,
}

/// Outcome of a text message send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    InvalidNumber,
    EmptyMessage,
    Failed(String),
}

/// Opaque token the carrier hands back so a menu session can continue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarrierSessionHandle(pub String);

impl fmt::Display for CarrierSessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A service-code request, either opening a session or replying inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCodeRequest {
    /// The code or, for replies, the raw menu input.
    pub code: String,
    pub sim_slot: usize,
    /// Set when continuing an interactive session.
    pub session: Option<CarrierSessionHandle>,
}

/// Asynchronous completion of a service-code request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCodeReply {
    Response {
        text: String,
        session: CarrierSessionHandle,
    },
    Failure {
        code: i32,
    },
}

/// Host telephony operations consumed by the conversation engines.
///
/// `start_service_code_session` may never complete; callers own the
/// timeout and drop the future when it fires.
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// SIMs currently usable for calls and messages.
    fn available_sims(&self) -> Vec<SimInfo>;

    /// Starts dialing. State after this call is tracked by the caller.
    async fn place_call(&self, number: &str, sim_slot: usize) -> Result<()>;

    async fn end_call(&self) -> Result<()>;

    /// Sends one DTMF tone. Returns false if the tone was not accepted.
    async fn send_dtmf(&self, tone: char) -> bool;

    async fn toggle_speaker(&self, on: bool);

    async fn toggle_mute(&self, on: bool);

    async fn send_text(&self, number: &str, body: &str, sim_slot: usize) -> SendOutcome;

    async fn start_service_code_session(&self, request: ServiceCodeRequest) -> ServiceCodeReply;

    /// Whether the host can deliver service-code responses back to the
    /// shell. Hosts that cannot fall back to [`CarrierAdapter::dial_service_code`].
    fn supports_service_sessions(&self) -> bool {
        true
    }

    /// Hands the code to the system dialer without waiting for a response.
    async fn dial_service_code(&self, code: &str, sim_slot: usize) -> Result<()> {
        let _ = sim_slot;
        Err(ShellError::PermissionDenied(format!(
            "system dialer unavailable for {}",
            code
        )))
    }
}

/// Readable message for a carrier failure code.
pub fn describe_failure_code(code: i32) -> String {
    match code {
        USSD_ERROR_SERVICE_UNAVAIL => "USSD service unavailable".to_string(),
        USSD_RETURN_FAILURE => "USSD request failed - network or carrier issue".to_string(),
        other => format!("Unknown USSD error (code: {})", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_failure_code() {
        assert_eq!(describe_failure_code(-2), "USSD service unavailable");
        assert_eq!(
            describe_failure_code(-1),
            "USSD request failed - network or carrier issue"
        );
        assert_eq!(describe_failure_code(7), "Unknown USSD error (code: 7)");
    }
}
