//! A simulated phone for running the shell on a desktop.
//!
//! Calls and texts are logged instead of placed, service codes answer from
//! a small canned table after a short delay, and device state is fixed.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use mentra_core::Result;
use mentra_core::action::SystemCommand;
use mentra_core::carrier::{
    CarrierAdapter, CarrierSessionHandle, SendOutcome, ServiceCodeReply, ServiceCodeRequest,
    SimInfo, USSD_RETURN_FAILURE,
};
use mentra_core::device::{
    BatteryStatus, DeviceController, DeviceInfo, DeviceSummary, HostAction, HostResult,
    NetworkStatus, StorageStatus, format_bytes,
};
use mentra_core::messaging::{MessageStore, ShellMessage};
use mentra_core::phone;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

const DATA_MENU: &str = "Data bundles\n1. Daily 100MB @ KES 20\n2. Weekly 1GB @ KES 250\n0. Exit";

/// Carrier adapter that records side effects in the log.
pub struct SimulatedCarrier {
    sims: usize,
    latency: Duration,
    sessions: AtomicUsize,
}

impl SimulatedCarrier {
    pub fn new(sims: usize) -> Self {
        Self {
            sims: sims.max(1),
            latency: Duration::from_millis(400),
            sessions: AtomicUsize::new(0),
        }
    }

    /// Overrides the delay before service-code replies.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn respond(&self, text: &str) -> ServiceCodeReply {
        let id = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        ServiceCodeReply::Response {
            text: text.to_string(),
            session: CarrierSessionHandle(format!("sim-{}", id)),
        }
    }
}

#[async_trait]
impl CarrierAdapter for SimulatedCarrier {
    fn available_sims(&self) -> Vec<SimInfo> {
        (0..self.sims)
            .map(|slot| SimInfo {
                slot,
                label: format!("SIM {} (Simulated)", slot + 1),
            })
            .collect()
    }

    async fn place_call(&self, number: &str, sim_slot: usize) -> Result<()> {
        info!(number, sim_slot, "Simulated call placed");
        Ok(())
    }

    async fn end_call(&self) -> Result<()> {
        info!("Simulated call ended");
        Ok(())
    }

    async fn send_dtmf(&self, tone: char) -> bool {
        info!(%tone, "Simulated DTMF");
        true
    }

    async fn toggle_speaker(&self, on: bool) {
        info!(on, "Simulated speaker");
    }

    async fn toggle_mute(&self, on: bool) {
        info!(on, "Simulated mute");
    }

    async fn send_text(&self, number: &str, body: &str, sim_slot: usize) -> SendOutcome {
        if body.trim().is_empty() {
            return SendOutcome::EmptyMessage;
        }
        if !phone::is_valid_phone_number(number) {
            return SendOutcome::InvalidNumber;
        }
        info!(number, sim_slot, chars = body.chars().count(), "Simulated text sent");
        SendOutcome::Success
    }

    async fn start_service_code_session(&self, request: ServiceCodeRequest) -> ServiceCodeReply {
        tokio::time::sleep(self.latency).await;
        info!(code = %request.code, sim_slot = request.sim_slot, "Simulated service code");
        match (request.session.is_some(), request.code.as_str()) {
            (false, "*144#") => self.respond("Your airtime balance is KES 152.40"),
            (false, "*135#") => self.respond("Your number is +254712345678"),
            (false, "*122#") => self.respond("You have 34 minutes remaining"),
            (false, "*544#") => self.respond(DATA_MENU),
            (false, "*544*44#") => self.respond("Data balance: 1.2GB, expires 23:59"),
            (true, "1") => self.respond("You have bought Daily 100MB. Valid until midnight"),
            (true, "2") => self.respond("You have bought Weekly 1GB. Valid for 7 days"),
            (true, "0") => self.respond("Thank you"),
            (true, _) => self.respond(&format!("Invalid choice\n{}", DATA_MENU)),
            _ => ServiceCodeReply::Failure {
                code: USSD_RETURN_FAILURE,
            },
        }
    }
}

/// Message store held in memory and seeded with a short history.
pub struct SimulatedMessageStore {
    messages: Mutex<Vec<ShellMessage>>,
}

impl SimulatedMessageStore {
    pub fn new(messages: Vec<ShellMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    /// A few recent messages from the sample contacts.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let message = |id: &str, address: &str, body: &str, mins: i64, outgoing: bool| {
            ShellMessage {
                id: id.to_string(),
                address: address.to_string(),
                body: body.to_string(),
                timestamp: now - ChronoDuration::minutes(mins),
                is_outgoing: outgoing,
                is_read: outgoing,
            }
        };
        Self::new(vec![
            message("1", "+15550001111", "Are we still on for dinner?", 90, false),
            message("2", "+15550001111", "Yes, 7pm", 85, true),
            message("3", "+15550001111", "Great, see you", 80, false),
            message("4", "+15550002222", "Call me when you're free", 30, false),
            message("5", "+254712345678", "Happy birthday!", 1440, true),
        ])
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ShellMessage>>> {
        self.messages
            .lock()
            .map_err(|_| mentra_core::ShellError::internal("message store lock poisoned"))
    }
}

#[async_trait]
impl MessageStore for SimulatedMessageStore {
    async fn all_messages(&self) -> Result<Vec<ShellMessage>> {
        Ok(self.lock()?.clone())
    }

    async fn mark_thread_read(&self, address: &str) -> Result<usize> {
        let mut messages = self.lock()?;
        let mut changed = 0;
        for m in messages
            .iter_mut()
            .filter(|m| !m.is_outgoing && !m.is_read && phone::same_number(&m.address, address))
        {
            m.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn record_sent(&self, address: &str, body: &str) -> Result<()> {
        let mut messages = self.lock()?;
        let id = (messages.len() + 1).to_string();
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

/// Device controller that accepts everything.
pub struct SimulatedDevice {
    info: SimulatedDeviceInfo,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            info: SimulatedDeviceInfo,
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceController for SimulatedDevice {
    async fn apply(&self, command: &SystemCommand) -> HostResult {
        info!(?command, "Simulated system command");
        match command {
            SystemCommand::SystemInfo => {
                let device = self.info.device();
                let storage = self.info.storage().unwrap_or(StorageStatus {
                    total_bytes: 0,
                    free_bytes: 0,
                });
                Ok(Some(format!(
                    "{} {} (OS {})\nStorage: {} free of {}",
                    device.manufacturer,
                    device.model,
                    device.os_version,
                    format_bytes(storage.free_bytes),
                    format_bytes(storage.total_bytes)
                )))
            }
            SystemCommand::Shutdown | SystemCommand::Reboot(_) => {
                Err("power control is not available in the simulator".to_string())
            }
            _ => Ok(None),
        }
    }

    async fn perform(&self, action: &HostAction) -> HostResult {
        info!(?action, "Simulated host action");
        match action {
            HostAction::ListFiles(path) => Ok(Some(format!("{}: Documents  Music  Pictures", path))),
            _ => Ok(None),
        }
    }
}

/// Fixed device readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedDeviceInfo;

impl DeviceInfo for SimulatedDeviceInfo {
    fn battery(&self) -> Option<BatteryStatus> {
        Some(BatteryStatus {
            level_percent: 76,
            charging: false,
        })
    }

    fn storage(&self) -> Option<StorageStatus> {
        Some(StorageStatus {
            total_bytes: 128 * 1024 * 1024 * 1024,
            free_bytes: 41 * 1024 * 1024 * 1024,
        })
    }

    fn steps_today(&self) -> Option<u64> {
        Some(4312)
    }

    fn network(&self) -> Option<NetworkStatus> {
        Some(NetworkStatus {
            connected: true,
            kind: "WiFi".to_string(),
            operator: Some("Simulated Carrier".to_string()),
        })
    }

    fn device(&self) -> DeviceSummary {
        DeviceSummary {
            manufacturer: "Mentra".to_string(),
            model: "Simulator".to_string(),
            os_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
