//! Hand-written collaborators for unit tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::action::SystemCommand;
use crate::carrier::{
    CarrierAdapter, CarrierSessionHandle, SendOutcome, ServiceCodeReply, ServiceCodeRequest,
    SimInfo,
};
use crate::contact::{Contact, ContactDirectory};
use crate::device::{
    BatteryStatus, DeviceController, DeviceInfo, DeviceSummary, HostAction, HostResult,
    NetworkStatus, StorageStatus,
};
use crate::error::Result;
use crate::messaging::{MessageStore, ShellMessage};
use crate::phone;

/// What the carrier does with the next service-code request.
pub enum ScriptedReply {
    Now(ServiceCodeReply),
    After(Duration, ServiceCodeReply),
    Never,
}

/// A side effect the shell asked the carrier for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierCall {
    PlaceCall { number: String, sim_slot: usize },
    EndCall,
    Dtmf(char),
    Speaker(bool),
    Mute(bool),
    SendText { number: String, body: String, sim_slot: usize },
    DialServiceCode { code: String, sim_slot: usize },
}

pub struct RecordingCarrier {
    sims: usize,
    service_sessions: bool,
    calls: Mutex<Vec<CarrierCall>>,
    scripts: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ServiceCodeRequest>>,
    send_outcome: Mutex<SendOutcome>,
}

impl RecordingCarrier {
    pub fn new(sims: usize) -> Self {
        Self {
            sims,
            service_sessions: true,
            calls: Mutex::new(Vec::new()),
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            send_outcome: Mutex::new(SendOutcome::Success),
        }
    }

    pub fn without_service_sessions(mut self) -> Self {
        self.service_sessions = false;
        self
    }

    pub fn script(&self, reply: ScriptedReply) {
        self.scripts.lock().unwrap().push_back(reply);
    }

    pub fn set_send_outcome(&self, outcome: SendOutcome) {
        *self.send_outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> Vec<CarrierCall> {
        self.calls.lock().unwrap().clone()
    }

    /// `(number, body, sim_slot)` of every text sent.
    pub fn texts(&self) -> Vec<(String, String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CarrierCall::SendText { number, body, sim_slot } => Some((number, body, sim_slot)),
                _ => None,
            })
            .collect()
    }

    pub fn placed_calls(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CarrierCall::PlaceCall { number, sim_slot } => Some((number, sim_slot)),
                _ => None,
            })
            .collect()
    }

    pub fn service_requests(&self) -> Vec<ServiceCodeRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, call: CarrierCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CarrierAdapter for RecordingCarrier {
    fn available_sims(&self) -> Vec<SimInfo> {
        (0..self.sims)
            .map(|slot| SimInfo {
                slot,
                label: format!("SIM {}", slot + 1),
            })
            .collect()
    }

    async fn place_call(&self, number: &str, sim_slot: usize) -> Result<()> {
        self.push(CarrierCall::PlaceCall {
            number: number.to_string(),
            sim_slot,
        });
        Ok(())
    }

    async fn end_call(&self) -> Result<()> {
        self.push(CarrierCall::EndCall);
        Ok(())
    }

    async fn send_dtmf(&self, tone: char) -> bool {
        self.push(CarrierCall::Dtmf(tone));
        true
    }

    async fn toggle_speaker(&self, on: bool) {
        self.push(CarrierCall::Speaker(on));
    }

    async fn toggle_mute(&self, on: bool) {
        self.push(CarrierCall::Mute(on));
    }

    async fn send_text(&self, number: &str, body: &str, sim_slot: usize) -> SendOutcome {
        self.push(CarrierCall::SendText {
            number: number.to_string(),
            body: body.to_string(),
            sim_slot,
        });
        self.send_outcome.lock().unwrap().clone()
    }

    async fn start_service_code_session(&self, request: ServiceCodeRequest) -> ServiceCodeReply {
        self.requests.lock().unwrap().push(request);
        let next = self.scripts.lock().unwrap().pop_front();
        match next {
            Some(ScriptedReply::Now(reply)) => reply,
            Some(ScriptedReply::After(delay, reply)) => {
                tokio::time::sleep(delay).await;
                reply
            }
            Some(ScriptedReply::Never) => std::future::pending().await,
            None => ServiceCodeReply::Response {
                text: "OK".to_string(),
                session: CarrierSessionHandle("default".to_string()),
            },
        }
    }

    fn supports_service_sessions(&self) -> bool {
        self.service_sessions
    }

    async fn dial_service_code(&self, code: &str, sim_slot: usize) -> Result<()> {
        self.push(CarrierCall::DialServiceCode {
            code: code.to_string(),
            sim_slot,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDevice {
    applied: Mutex<Vec<SystemCommand>>,
    performed: Mutex<Vec<HostAction>>,
    failure: Mutex<Option<String>>,
}

impl RecordingDevice {
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn applied(&self) -> Vec<SystemCommand> {
        self.applied.lock().unwrap().clone()
    }

    pub fn performed(&self) -> Vec<HostAction> {
        self.performed.lock().unwrap().clone()
    }

    fn outcome(&self) -> HostResult {
        match self.failure.lock().unwrap().clone() {
            Some(reason) => Err(reason),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DeviceController for RecordingDevice {
    async fn apply(&self, command: &SystemCommand) -> HostResult {
        self.applied.lock().unwrap().push(command.clone());
        self.outcome()
    }

    async fn perform(&self, action: &HostAction) -> HostResult {
        self.performed.lock().unwrap().push(action.clone());
        self.outcome()
    }
}

pub struct StaticInfo;

impl DeviceInfo for StaticInfo {
    fn battery(&self) -> Option<BatteryStatus> {
        Some(BatteryStatus {
            level_percent: 50,
            charging: false,
        })
    }

    fn storage(&self) -> Option<StorageStatus> {
        None
    }

    fn steps_today(&self) -> Option<u64> {
        Some(1200)
    }

    fn network(&self) -> Option<NetworkStatus> {
        None
    }

    fn device(&self) -> DeviceSummary {
        DeviceSummary {
            manufacturer: "Test".into(),
            model: "Phone".into(),
            os_version: "1".into(),
        }
    }
}

pub struct FixedContacts(pub Vec<Contact>);

impl FixedContacts {
    /// Jane and John Doe, Mary Jane, and a single Bob.
    pub fn sample() -> Self {
        Self(vec![
            Contact::new("c1", "Jane Doe", "+15550001111"),
            Contact::new("c2", "John Doe", "+15550002222"),
            Contact::new("c3", "Mary Jane", "+254712345678"),
            Contact::new("c4", "Bob Builder", "+15550003333"),
        ])
    }
}

#[async_trait]
impl ContactDirectory for FixedContacts {
    async fn all_contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<ShellMessage>>,
}

impl MemoryMessageStore {
    pub fn with_messages(messages: Vec<ShellMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    pub fn snapshot(&self) -> Vec<ShellMessage> {
        self.messages.lock().unwrap().clone()
    }
}

/// An incoming message at `10:<minute>` on a fixed day.
pub fn incoming(id: &str, address: &str, body: &str, minute: u32, read: bool) -> ShellMessage {
    ShellMessage {
        id: id.to_string(),
        address: address.to_string(),
        body: body.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
        is_outgoing: false,
        is_read: read,
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn all_messages(&self) -> Result<Vec<ShellMessage>> {
        Ok(self.snapshot())
    }

    async fn mark_thread_read(&self, address: &str) -> Result<usize> {
        let mut messages = self.messages.lock().unwrap();
        let mut changed = 0;
        for m in messages.iter_mut() {
            if !m.is_outgoing && !m.is_read && phone::same_number(&m.address, address) {
                m.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn record_sent(&self, address: &str, body: &str) -> Result<()> {
        let mut messages = self.messages.lock().unwrap();
        let id = format!("sent-{}", messages.len() + 1);
        messages.push(ShellMessage {
            id,
            address: address.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
            is_outgoing: true,
            is_read: true,
        });
        Ok(())
    }
}
