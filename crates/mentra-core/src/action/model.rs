use serde::Serialize;
use std::collections::BTreeMap;
use strum::Display;

use crate::command::Command;

/// What a command asks the device to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum ActionKind {
    OpenApp,
    OpenSettings,
    MakeCall,
    SendSms,
    PlayMedia,
    PauseMedia,
    StopMedia,
    NextTrack,
    PreviousTrack,
    NavigateTo,
    Query,
    ListFiles,
    ReadFile,
    WriteFile,
    DeleteFile,
    SystemCommand,
    Unknown,
}

/// Verbs handled by the system handler.
const SYSTEM_VERBS: &[&str] = &[
    "shutdown", "poweroff", "reboot", "restart", "sleep", "suspend", "lock",
    "wifi", "data", "mobiledata", "airplane", "airplanemode", "bluetooth", "bt",
    "brightness", "timeout", "screentimeout", "autobrightness",
    "volume", "mute",
    "settime", "settimezone", "autotime",
    "freeze", "disable", "unfreeze", "enable", "hide", "unhide",
    "performance", "perf", "batterysaver", "powersave", "clearram", "freeram", "clearcache",
    "dnd", "donotdisturb", "notify",
    "developermode", "devmode", "adb", "usbdebug", "stayawake", "animations", "location",
    "sysinfo", "systeminfo",
];

impl ActionKind {
    /// Looks a verb up in the static verb table.
    pub fn for_verb(verb: &str) -> ActionKind {
        match verb {
            "open" | "launch" | "start" => ActionKind::OpenApp,
            "settings" => ActionKind::OpenSettings,
            "call" | "dial" => ActionKind::MakeCall,
            "message" | "sms" | "text" => ActionKind::SendSms,
            "play" => ActionKind::PlayMedia,
            "pause" => ActionKind::PauseMedia,
            "stop" => ActionKind::StopMedia,
            "next" => ActionKind::NextTrack,
            "previous" | "prev" => ActionKind::PreviousTrack,
            "navigate" | "goto" | "go" => ActionKind::NavigateTo,
            "show" | "display" | "get" => ActionKind::Query,
            "ls" | "list" => ActionKind::ListFiles,
            "cat" | "read" => ActionKind::ReadFile,
            "write" | "echo" => ActionKind::WriteFile,
            "rm" | "delete" | "del" => ActionKind::DeleteFile,
            v if SYSTEM_VERBS.contains(&v) => ActionKind::SystemCommand,
            _ => ActionKind::Unknown,
        }
    }

    /// Kinds that never run without an explicit confirmation.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, ActionKind::DeleteFile | ActionKind::SendSms)
    }

    pub fn system_verbs() -> &'static [&'static str] {
        SYSTEM_VERBS
    }
}

/// A command mapped onto an action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    pub verb: String,
    pub target: Option<String>,
    pub entity: Option<String>,
    pub params: BTreeMap<String, String>,
    pub requires_confirmation: bool,
}

impl Action {
    pub fn from_command(command: &Command) -> Self {
        let kind = ActionKind::for_verb(&command.verb);
        Self {
            kind,
            verb: command.verb.clone(),
            target: command.target.clone(),
            entity: command.entity.clone(),
            params: command.flags.clone(),
            requires_confirmation: kind.requires_confirmation(),
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Target followed by the entity words.
    pub fn arguments(&self) -> Vec<&str> {
        let mut args = Vec::new();
        if let Some(target) = &self.target {
            args.push(target.as_str());
        }
        if let Some(entity) = &self.entity {
            args.extend(entity.split_whitespace());
        }
        args
    }

    /// Rebuilds a natural-language line from verb, target and entity.
    pub fn to_line(&self) -> String {
        let mut line = self.verb.clone();
        if let Some(target) = &self.target {
            line.push(' ');
            line.push_str(target);
        }
        if let Some(entity) = &self.entity {
            line.push(' ');
            line.push_str(entity);
        }
        line
    }
}
