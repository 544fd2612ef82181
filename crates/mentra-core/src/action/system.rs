//! System, power, network, display, audio and app-lifecycle commands.

use chrono::NaiveTime;
use serde::Serialize;
use strum::Display;

use crate::action::Action;
use crate::error::{Result, ShellError};

/// Parses an on/off style value, case-insensitively.
pub fn parse_bool_state(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" | "enable" => Some(true),
        "off" | "false" | "0" | "no" | "disable" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum RebootMode {
    Normal,
    Recovery,
    Bootloader,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AudioStream {
    Music,
    Ring,
    Notification,
    Alarm,
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum PerformanceMode {
    High,
    Balanced,
    PowerSave,
}

/// Device settings that are switched on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Toggle {
    Wifi,
    MobileData,
    Airplane,
    Bluetooth,
    AutoBrightness,
    Mute,
    AutoTime,
    BatterySaver,
    DoNotDisturb,
    DeveloperMode,
    UsbDebugging,
    StayAwake,
    Animations,
    Location,
}

impl Toggle {
    pub fn label(self) -> &'static str {
        match self {
            Toggle::Wifi => "WiFi",
            Toggle::MobileData => "Mobile data",
            Toggle::Airplane => "Airplane mode",
            Toggle::Bluetooth => "Bluetooth",
            Toggle::AutoBrightness => "Auto-brightness",
            Toggle::Mute => "Mute",
            Toggle::AutoTime => "Automatic time",
            Toggle::BatterySaver => "Battery saver",
            Toggle::DoNotDisturb => "Do not disturb",
            Toggle::DeveloperMode => "Developer mode",
            Toggle::UsbDebugging => "USB debugging",
            Toggle::StayAwake => "Stay awake",
            Toggle::Animations => "Animations",
            Toggle::Location => "Location",
        }
    }

    fn for_name(name: &str) -> Option<Toggle> {
        Some(match name {
            "wifi" => Toggle::Wifi,
            "data" | "mobiledata" => Toggle::MobileData,
            "airplane" | "airplanemode" => Toggle::Airplane,
            "bluetooth" | "bt" => Toggle::Bluetooth,
            "autobrightness" => Toggle::AutoBrightness,
            "mute" => Toggle::Mute,
            "autotime" => Toggle::AutoTime,
            "batterysaver" | "powersave" => Toggle::BatterySaver,
            "dnd" | "donotdisturb" => Toggle::DoNotDisturb,
            "developermode" | "devmode" => Toggle::DeveloperMode,
            "adb" | "usbdebug" => Toggle::UsbDebugging,
            "stayawake" => Toggle::StayAwake,
            "animations" => Toggle::Animations,
            "location" => Toggle::Location,
            _ => return None,
        })
    }
}

/// A fully validated request for the host's device controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SystemCommand {
    Shutdown,
    Reboot(RebootMode),
    Sleep,
    Lock,
    Set(Toggle, bool),
    Brightness(u8),
    ScreenTimeout(u32),
    Volume { stream: AudioStream, level: u8 },
    SetTime(NaiveTime),
    SetTimezone(String),
    FreezeApp(String),
    UnfreezeApp(String),
    HideApp(String),
    UnhideApp(String),
    Performance(PerformanceMode),
    ClearRam,
    ClearCache(Option<String>),
    Notify { title: Option<String>, message: String },
    SystemInfo,
}

const MAX_VOLUME: u8 = 15;

impl SystemCommand {
    /// Builds a system command from a routed action.
    ///
    /// The command name is the verb; `system <name> ...` and `sys <name> ...`
    /// are accepted too. On/off values come from `--state`, then the first
    /// argument.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` with a usage line for bad arguments and for
    /// unknown command names.
    pub fn from_action(action: &Action) -> Result<SystemCommand> {
        let mut args: Vec<&str> = action.arguments();
        let name = if matches!(action.verb.as_str(), "system" | "sys") {
            if args.is_empty() {
                return Err(unknown(""));
            }
            args.remove(0).to_lowercase()
        } else {
            action.verb.to_lowercase()
        };
        let first = args.first().copied();
        let joined = if args.is_empty() {
            None
        } else {
            Some(args.join(" "))
        };

        if let Some(toggle) = Toggle::for_name(&name) {
            let raw = action.param("state").or(first);
            let state = raw.and_then(parse_bool_state).ok_or_else(|| {
                ShellError::invalid_command(format!(
                    "Invalid state for {}. Use: on/off, true/false, enable/disable",
                    name
                ))
            })?;
            return Ok(SystemCommand::Set(toggle, state));
        }

        match name.as_str() {
            "shutdown" | "poweroff" => Ok(SystemCommand::Shutdown),
            "reboot" | "restart" => {
                let mode = action.param("mode").or(first).unwrap_or("");
                Ok(SystemCommand::Reboot(match mode.to_lowercase().as_str() {
                    "recovery" => RebootMode::Recovery,
                    "bootloader" | "fastboot" => RebootMode::Bootloader,
                    "safe" | "safemode" => RebootMode::Safe,
                    _ => RebootMode::Normal,
                }))
            }
            "sleep" | "suspend" => Ok(SystemCommand::Sleep),
            "lock" => Ok(SystemCommand::Lock),
            "brightness" => action
                .param("level")
                .or(first)
                .and_then(|v| v.parse::<u8>().ok())
                .map(SystemCommand::Brightness)
                .ok_or_else(|| usage("brightness <0-255>")),
            "timeout" | "screentimeout" => action
                .param("seconds")
                .or(first)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|s| *s > 0)
                .map(SystemCommand::ScreenTimeout)
                .ok_or_else(|| usage("timeout <seconds>")),
            "volume" => parse_volume(action, &args),
            "settime" => first
                .and_then(|v| NaiveTime::parse_from_str(v, "%H:%M").ok())
                .map(SystemCommand::SetTime)
                .ok_or_else(|| usage("settime <HH:MM>")),
            "settimezone" => first
                .map(|z| SystemCommand::SetTimezone(z.to_string()))
                .ok_or_else(|| usage("settimezone <zone>")),
            "freeze" | "disable" => package(first, "freeze").map(SystemCommand::FreezeApp),
            "unfreeze" | "enable" => package(first, "unfreeze").map(SystemCommand::UnfreezeApp),
            "hide" => package(first, "hide").map(SystemCommand::HideApp),
            "unhide" => package(first, "unhide").map(SystemCommand::UnhideApp),
            "performance" | "perf" => {
                let mode = match first.map(str::to_lowercase).as_deref() {
                    Some("high") | Some("performance") => PerformanceMode::High,
                    Some("balanced") | Some("normal") => PerformanceMode::Balanced,
                    Some("low") | Some("powersave") | Some("save") => PerformanceMode::PowerSave,
                    _ => return Err(usage("performance <high|balanced|powersave>")),
                };
                Ok(SystemCommand::Performance(mode))
            }
            "clearram" | "freeram" => Ok(SystemCommand::ClearRam),
            "clearcache" => Ok(SystemCommand::ClearCache(first.map(str::to_string))),
            "notify" => match joined {
                Some(message) => Ok(SystemCommand::Notify {
                    title: action.param("title").map(str::to_string),
                    message,
                }),
                None => Err(usage("notify \"message\" --title <title>")),
            },
            "sysinfo" | "systeminfo" => Ok(SystemCommand::SystemInfo),
            other => Err(unknown(other)),
        }
    }

    /// What to tell the user when the host reports success without text.
    pub fn success_message(&self) -> String {
        match self {
            SystemCommand::Shutdown => "System shutdown initiated...".to_string(),
            SystemCommand::Reboot(mode) => format!("System reboot initiated (mode: {})...", mode),
            SystemCommand::Sleep => "Device entering sleep mode...".to_string(),
            SystemCommand::Lock => "Screen locked".to_string(),
            SystemCommand::Set(Toggle::Mute, true) => "All audio muted".to_string(),
            SystemCommand::Set(Toggle::Mute, false) => "Audio unmuted".to_string(),
            SystemCommand::Set(toggle, on) => format!(
                "{} {}",
                toggle.label(),
                if *on { "enabled" } else { "disabled" }
            ),
            SystemCommand::Brightness(level) => format!("Brightness set to {}", level),
            SystemCommand::ScreenTimeout(secs) => {
                format!("Screen timeout set to {} seconds", secs)
            }
            SystemCommand::Volume { stream, level } => {
                format!("Volume ({}) set to {}", stream, level)
            }
            SystemCommand::SetTime(time) => format!("Time set to {}", time.format("%H:%M")),
            SystemCommand::SetTimezone(zone) => format!("Timezone set to {}", zone),
            SystemCommand::FreezeApp(p) => format!("App frozen: {}", p),
            SystemCommand::UnfreezeApp(p) => format!("App unfrozen: {}", p),
            SystemCommand::HideApp(p) => format!("App hidden: {}", p),
            SystemCommand::UnhideApp(p) => format!("App unhidden: {}", p),
            SystemCommand::Performance(mode) => format!("Performance mode set to {}", mode),
            SystemCommand::ClearRam => "Memory cleared".to_string(),
            SystemCommand::ClearCache(Some(p)) => format!("Cache cleared for {}", p),
            SystemCommand::ClearCache(None) => "Cache cleared".to_string(),
            SystemCommand::Notify { .. } => "Notification sent".to_string(),
            SystemCommand::SystemInfo => "System information unavailable".to_string(),
        }
    }

    /// Prefix for host failures.
    pub fn failure_message(&self) -> String {
        match self {
            SystemCommand::Set(toggle, _) => format!("Failed to change {}", toggle.label()),
            _ => "System command failed".to_string(),
        }
    }
}

fn parse_volume(action: &Action, args: &[&str]) -> Result<SystemCommand> {
    let usage_line = "volume [music|ring|notification|alarm|call] <0-15>";
    let stream_name = action.param("type").map(str::to_string).or_else(|| {
        args.first()
            .filter(|a| a.parse::<u8>().is_err())
            .map(|a| a.to_lowercase())
    });
    let stream = match stream_name.as_deref() {
        None | Some("music") | Some("media") => AudioStream::Music,
        Some("ring") | Some("ringer") => AudioStream::Ring,
        Some("notification") | Some("notif") => AudioStream::Notification,
        Some("alarm") => AudioStream::Alarm,
        Some("call") | Some("voice") => AudioStream::Call,
        Some(_) => return Err(usage(usage_line)),
    };
    let level = args
        .iter()
        .rev()
        .find_map(|a| a.parse::<u8>().ok())
        .filter(|l| *l <= MAX_VOLUME)
        .ok_or_else(|| usage(usage_line))?;
    Ok(SystemCommand::Volume { stream, level })
}

fn package(arg: Option<&str>, verb: &str) -> Result<String> {
    arg.map(str::to_string)
        .ok_or_else(|| usage(&format!("{} <package_name>", verb)))
}

fn usage(line: &str) -> ShellError {
    ShellError::invalid_command(format!("Usage: {}", line))
}

fn unknown(name: &str) -> ShellError {
    ShellError::invalid_command(format!(
        "Unknown system command: {}. Type 'syshelp' for system commands.",
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parse;

    fn command(line: &str) -> Result<SystemCommand> {
        SystemCommand::from_action(&Action::from_command(&parse(line)))
    }

    #[test]
    fn test_parse_bool_state() {
        for on in ["on", "TRUE", "1", "Yes", "enable"] {
            assert_eq!(parse_bool_state(on), Some(true));
        }
        for off in ["off", "false", "0", "NO", "disable"] {
            assert_eq!(parse_bool_state(off), Some(false));
        }
        assert_eq!(parse_bool_state("maybe"), None);
    }

    #[test]
    fn test_wifi_state_flag() {
        assert_eq!(
            command("wifi --state=on").unwrap(),
            SystemCommand::Set(Toggle::Wifi, true)
        );
        assert_eq!(
            command("bluetooth off").unwrap(),
            SystemCommand::Set(Toggle::Bluetooth, false)
        );
        let err = command("wifi --state=maybe").unwrap_err();
        assert!(matches!(err, ShellError::InvalidCommand(_)));
        assert!(err.to_string().contains("Invalid state for wifi"));
        assert!(command("wifi").is_err());
    }

    #[test]
    fn test_reboot_modes() {
        assert_eq!(
            command("reboot recovery").unwrap(),
            SystemCommand::Reboot(RebootMode::Recovery)
        );
        assert_eq!(
            command("restart --mode=fastboot").unwrap(),
            SystemCommand::Reboot(RebootMode::Bootloader)
        );
        assert_eq!(
            command("reboot").unwrap(),
            SystemCommand::Reboot(RebootMode::Normal)
        );
    }

    #[test]
    fn test_brightness_and_timeout_bounds() {
        assert_eq!(command("brightness 200").unwrap(), SystemCommand::Brightness(200));
        assert_eq!(
            command("brightness 300").unwrap_err().to_string(),
            "Invalid command: Usage: brightness <0-255>"
        );
        assert_eq!(command("timeout 60").unwrap(), SystemCommand::ScreenTimeout(60));
        assert!(command("timeout 0").is_err());
    }

    #[test]
    fn test_volume() {
        assert_eq!(
            command("volume 7").unwrap(),
            SystemCommand::Volume { stream: AudioStream::Music, level: 7 }
        );
        assert_eq!(
            command("volume ring 3").unwrap(),
            SystemCommand::Volume { stream: AudioStream::Ring, level: 3 }
        );
        assert_eq!(
            command("volume 5 --type=alarm").unwrap(),
            SystemCommand::Volume { stream: AudioStream::Alarm, level: 5 }
        );
        assert!(command("volume loud").is_err());
        assert!(command("volume 99").is_err());
    }

    #[test]
    fn test_app_lifecycle_and_notify() {
        assert_eq!(
            command("freeze com.example.game").unwrap(),
            SystemCommand::FreezeApp("com.example.game".into())
        );
        assert!(command("hide").is_err());
        assert_eq!(
            command("notify \"stand up\" --title Break").unwrap(),
            SystemCommand::Notify {
                title: Some("Break".into()),
                message: "stand up".into()
            }
        );
        assert_eq!(
            command("settime 07:30").unwrap(),
            SystemCommand::SetTime(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_system_prefix_and_unknown() {
        assert_eq!(command("system lock").unwrap(), SystemCommand::Lock);
        let err = command("system teleport").unwrap_err();
        assert!(err.to_string().contains("Unknown system command: teleport"));
    }

    #[test]
    fn test_success_messages() {
        assert_eq!(
            SystemCommand::Set(Toggle::Wifi, true).success_message(),
            "WiFi enabled"
        );
        assert_eq!(
            SystemCommand::Set(Toggle::Mute, true).success_message(),
            "All audio muted"
        );
        assert_eq!(
            SystemCommand::Volume { stream: AudioStream::Ring, level: 3 }.success_message(),
            "Volume (ring) set to 3"
        );
    }
}
