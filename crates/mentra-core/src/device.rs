//! Host collaborators behind the leaf action handlers.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::action::SystemCommand;

/// Result of a host operation.
///
/// `Ok(None)` means done with nothing to report; `Ok(Some(text))` carries
/// output for the user; `Err` carries the host's reason for failing.
pub type HostResult = std::result::Result<Option<String>, String>;

/// Media transport commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MediaCommand {
    Play(Option<String>),
    Pause,
    Stop,
    Next,
    Previous,
}

/// Non-system actions the host performs on the shell's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HostAction {
    LaunchApp(String),
    OpenSettings(Option<String>),
    Media(MediaCommand),
    Navigate(String),
    ListFiles(String),
    ReadFile(String),
    WriteFile { path: String, content: String },
    DeleteFile(String),
}

/// Performs device-side effects.
#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Applies a power, network, display, audio or app-lifecycle change.
    async fn apply(&self, command: &SystemCommand) -> HostResult;

    /// Launches apps, drives media, navigates, or touches files.
    async fn perform(&self, action: &HostAction) -> HostResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatteryStatus {
    pub level_percent: u8,
    pub charging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub connected: bool,
    pub kind: String,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub manufacturer: String,
    pub model: String,
    pub os_version: String,
}

/// Side-effect-free reads of device state.
pub trait DeviceInfo: Send + Sync {
    fn battery(&self) -> Option<BatteryStatus>;
    fn storage(&self) -> Option<StorageStatus>;
    fn steps_today(&self) -> Option<u64>;
    fn network(&self) -> Option<NetworkStatus>;
    fn device(&self) -> DeviceSummary;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Formats a byte count with binary units, one decimal place.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
