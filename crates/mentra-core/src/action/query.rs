use std::sync::Arc;

use crate::action::Action;
use crate::device::{DeviceInfo, format_bytes};
use crate::result::ShellResult;

/// Answers `show|display|get <what>` from device state. Never mutates.
pub struct QueryHandler {
    info: Arc<dyn DeviceInfo>,
}

impl QueryHandler {
    pub fn new(info: Arc<dyn DeviceInfo>) -> Self {
        Self { info }
    }

    pub fn handle(&self, action: &Action) -> ShellResult {
        let what = action
            .target
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        match what.as_str() {
            "battery" => match self.info.battery() {
                Some(b) => ShellResult::success(format!(
                    "Battery: {}%{}",
                    b.level_percent,
                    if b.charging { " (charging)" } else { "" }
                )),
                None => ShellResult::failure("Battery status unavailable"),
            },
            "storage" => match self.info.storage() {
                Some(s) => ShellResult::success(format!(
                    "Storage: {} free of {}",
                    format_bytes(s.free_bytes),
                    format_bytes(s.total_bytes)
                )),
                None => ShellResult::failure("Storage status unavailable"),
            },
            "time" => ShellResult::success(format!(
                "Current time: {}",
                self.info.now().format("%H:%M:%S")
            )),
            "date" => ShellResult::success(format!(
                "Today is {}",
                self.info.now().format("%A, %B %d, %Y")
            )),
            "steps" => match self.info.steps_today() {
                Some(steps) => ShellResult::success(format!("Steps today: {}", steps)),
                None => ShellResult::failure("Step counter unavailable"),
            },
            "network" => match self.info.network() {
                Some(n) if n.connected => ShellResult::success(format!(
                    "Network: {}{}",
                    n.kind,
                    n.operator
                        .map(|o| format!(" ({})", o))
                        .unwrap_or_default()
                )),
                Some(_) => ShellResult::success("Network: disconnected"),
                None => ShellResult::failure("Network status unavailable"),
            },
            "device" => {
                let d = self.info.device();
                ShellResult::success(format!(
                    "Device: {} {} (OS {})",
                    d.manufacturer, d.model, d.os_version
                ))
            }
            "" => ShellResult::invalid("Usage: show <battery|storage|time|date|steps|network|device>"),
            other => ShellResult::not_found(format!("Unknown query: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::command::parse;
    use crate::device::{BatteryStatus, DeviceSummary, NetworkStatus, StorageStatus};
    use crate::result::ResultStatus;
    use chrono::{DateTime, Local, TimeZone};

    struct FixedInfo;

    impl DeviceInfo for FixedInfo {
        fn battery(&self) -> Option<BatteryStatus> {
            Some(BatteryStatus { level_percent: 82, charging: true })
        }
        fn storage(&self) -> Option<StorageStatus> {
            Some(StorageStatus { total_bytes: 64 << 30, free_bytes: 12 << 30 })
        }
        fn steps_today(&self) -> Option<u64> {
            None
        }
        fn network(&self) -> Option<NetworkStatus> {
            Some(NetworkStatus {
                connected: true,
                kind: "LTE".into(),
                operator: Some("Safaricom".into()),
            })
        }
        fn device(&self) -> DeviceSummary {
            DeviceSummary {
                manufacturer: "Acme".into(),
                model: "P1".into(),
                os_version: "14".into(),
            }
        }
        fn now(&self) -> DateTime<Local> {
            Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
        }
    }

    fn query(line: &str) -> ShellResult {
        QueryHandler::new(Arc::new(FixedInfo)).handle(&Action::from_command(&parse(line)))
    }

    #[test]
    fn test_queries() {
        assert_eq!(query("show battery").message, "Battery: 82% (charging)");
        assert_eq!(query("get storage").message, "Storage: 12.0 GB free of 64.0 GB");
        assert_eq!(query("show time").message, "Current time: 14:05:07");
        assert_eq!(query("display network").message, "Network: LTE (Safaricom)");
        assert_eq!(query("show device").message, "Device: Acme P1 (OS 14)");
        assert_eq!(query("show steps").status, ResultStatus::Failure);
    }

    #[test]
    fn test_unknown_query() {
        let result = query("show weather");
        assert_eq!(result.status, ResultStatus::NotFound);
        assert_eq!(result.message, "Unknown query: weather");
        assert_eq!(query("show").status, ResultStatus::InvalidCommand);
    }
}
