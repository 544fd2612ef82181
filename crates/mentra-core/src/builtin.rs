//! Builtin command reference.
//!
//! Shell built-ins are run by the executor itself; the other groups list
//! what the conversation engines and the router understand so that help
//! and completion have one source.

use serde::Serialize;
use std::sync::OnceLock;
use strum::Display;

/// Which part of the shell handles a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum CommandGroup {
    #[strum(serialize = "SHELL")]
    Shell,
    #[strum(serialize = "CALLS")]
    Calling,
    #[strum(serialize = "MESSAGES")]
    Messaging,
    #[strum(serialize = "SERVICE CODES")]
    ServiceCodes,
    #[strum(serialize = "DEVICE")]
    Device,
}

/// One documented command.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinCommand {
    /// Command word as typed.
    pub name: &'static str,
    /// Other words that run the same command.
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
    pub group: CommandGroup,
}

impl BuiltinCommand {
    pub const fn new(
        name: &'static str,
        aliases: &'static [&'static str],
        usage: &'static str,
        description: &'static str,
        group: CommandGroup,
    ) -> Self {
        Self {
            name,
            aliases,
            usage,
            description,
            group,
        }
    }

    pub fn matches(&self, word: &str) -> bool {
        self.name == word || self.aliases.contains(&word)
    }
}

static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinCommand>> = OnceLock::new();

/// Every documented command, initialized on first access.
pub fn builtin_commands() -> &'static [BuiltinCommand] {
    use CommandGroup::*;
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinCommand::new("cd", &[], "cd [dir]", "Change directory (default /)", Shell),
            BuiltinCommand::new("pwd", &[], "pwd", "Print working directory", Shell),
            BuiltinCommand::new("history", &["h"], "history [n]", "Show the last n commands (default 10)", Shell),
            BuiltinCommand::new("clear", &["c"], "clear", "Clear the screen and any pending message", Shell),
            BuiltinCommand::new("export", &[], "export VAR=value", "Set an environment variable", Shell),
            BuiltinCommand::new("env", &[], "env", "List environment variables", Shell),
            BuiltinCommand::new("alias", &[], "alias [name=value]", "List or set shell aliases", Shell),
            BuiltinCommand::new("!!", &[], "!!", "Run the previous command again", Shell),
            BuiltinCommand::new("help", &["?"], "help", "Show this reference", Shell),
            BuiltinCommand::new("syshelp", &[], "syshelp", "Show the device command guide", Shell),
            BuiltinCommand::new("call", &["dial", "phone", "ring"], "call <name|number|alias> [sim N]", "Place a call", Calling),
            BuiltinCommand::new("check balance", &["balance", "check data", "my number"], "check balance [sim N]", "Run a carrier shortcut code", Calling),
            BuiltinCommand::new("text", &["sms", "message", "send"], "text <name|number|alias> <message>", "Send a text message", Messaging),
            BuiltinCommand::new("inbox", &["messages"], "inbox [name] [n]", "List recent conversations", Messaging),
            BuiltinCommand::new("unread", &[], "unread", "Count unread messages", Messaging),
            BuiltinCommand::new("read", &["chat"], "read <contact> [n]", "Open a conversation", Messaging),
            BuiltinCommand::new("reply", &[], "reply <message>", "Reply in the open conversation", Messaging),
            BuiltinCommand::new("close", &[], "close", "Close the open conversation", Messaging),
            BuiltinCommand::new("aliases", &[], "aliases", "List contact aliases", Messaging),
            BuiltinCommand::new("alias", &[], "alias <name> = <contact|number>", "Set a contact alias", Messaging),
            BuiltinCommand::new("unalias", &[], "unalias <name>", "Remove a contact alias", Messaging),
            BuiltinCommand::new("*144#", &[], "<code> | call <code>", "Dial a USSD code; reply to menus, 'cancel' to end", ServiceCodes),
            BuiltinCommand::new("show", &["display", "get"], "show battery|storage|time|date|steps|network|device", "Query device state", Device),
            BuiltinCommand::new("open", &["launch", "start"], "open <app>", "Open an app", Device),
            BuiltinCommand::new("play", &["pause", "stop", "next", "previous"], "play [song]", "Control media playback", Device),
            BuiltinCommand::new("ls", &["list", "cat", "write", "rm"], "ls [path]", "Work with files", Device),
        ]
    })
}

/// The executor-level built-in a verb names, if any.
pub fn find_shell_builtin(verb: &str) -> Option<&'static BuiltinCommand> {
    builtin_commands()
        .iter()
        .find(|cmd| cmd.group == CommandGroup::Shell && cmd.matches(verb))
}

/// Words offered by line completion: every name and alias plus the
/// device verbs.
pub fn completion_words() -> Vec<&'static str> {
    let mut words: Vec<&'static str> = builtin_commands()
        .iter()
        .flat_map(|cmd| std::iter::once(cmd.name).chain(cmd.aliases.iter().copied()))
        .filter(|w| !w.starts_with('*'))
        .chain(crate::action::ActionKind::system_verbs().iter().copied())
        .collect();
    words.sort_unstable();
    words.dedup();
    words
}

/// The `help` text, grouped.
pub fn help_text() -> String {
    let groups = [
        CommandGroup::Shell,
        CommandGroup::Calling,
        CommandGroup::Messaging,
        CommandGroup::ServiceCodes,
        CommandGroup::Device,
    ];
    let mut lines = vec!["Mentra shell".to_string()];
    for group in groups {
        lines.push(String::new());
        lines.push(format!("{}:", group));
        for cmd in builtin_commands().iter().filter(|c| c.group == group) {
            lines.push(format!("  {:<40} {}", cmd.usage, cmd.description));
        }
    }
    lines.push(String::new());
    lines.push("Type 'syshelp' for system commands.".to_string());
    lines.join("\n")
}

const SYSHELP: &[(&str, &[(&str, &str)])] = &[
    (
        "POWER",
        &[
            ("shutdown", "Shut the device down"),
            ("reboot [recovery|bootloader|safe]", "Reboot, optionally into a mode"),
            ("sleep", "Turn the screen off"),
            ("lock", "Lock the screen"),
        ],
    ),
    (
        "NETWORK",
        &[
            ("wifi on|off", "Toggle WiFi"),
            ("data on|off", "Toggle mobile data"),
            ("airplane on|off", "Toggle airplane mode"),
            ("bluetooth on|off", "Toggle Bluetooth"),
            ("location on|off", "Toggle location"),
        ],
    ),
    (
        "DISPLAY",
        &[
            ("brightness <0-255>", "Set brightness"),
            ("autobrightness on|off", "Toggle auto brightness"),
            ("timeout <seconds>", "Set screen timeout"),
        ],
    ),
    (
        "AUDIO",
        &[
            ("volume [ring|notification|alarm|call] <0-15>", "Set a stream volume (default music)"),
            ("mute on|off", "Mute all audio"),
            ("dnd on|off", "Toggle Do Not Disturb"),
        ],
    ),
    (
        "APPS",
        &[
            ("freeze|unfreeze <package>", "Disable or enable an app"),
            ("hide|unhide <package>", "Hide or show an app"),
            ("clearcache [package]", "Clear one or all app caches"),
        ],
    ),
    (
        "PERFORMANCE",
        &[
            ("performance high|balanced|powersave", "Set the performance profile"),
            ("batterysaver on|off", "Toggle battery saver"),
            ("clearram", "Free memory"),
        ],
    ),
    (
        "SETTINGS",
        &[
            ("settime HH:MM", "Set the clock"),
            ("settimezone <zone>", "Set the time zone"),
            ("autotime on|off", "Toggle network time"),
            ("developermode|adb|stayawake|animations on|off", "Developer toggles"),
            ("notify \"message\" --title T", "Post a notification"),
        ],
    ),
    (
        "INFO",
        &[
            ("show battery|storage|time|date|steps|network|device", "Query device state"),
            ("sysinfo", "Full system summary"),
        ],
    ),
];

/// The `syshelp` text.
pub fn syshelp_text() -> String {
    let mut lines = vec!["Mentra system commands".to_string()];
    for (section, entries) in SYSHELP {
        lines.push(String::new());
        lines.push(format!("{}:", section));
        for (usage, description) in entries.iter() {
            lines.push(format!("  {:<48} {}", usage, description));
        }
    }
    lines.push(String::new());
    lines.push("States also accept --state=on|off, true/false, enable/disable.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands_initialized() {
        let commands = builtin_commands();
        assert!(commands.iter().any(|c| c.name == "help"));
        assert!(std::ptr::eq(commands, builtin_commands()));
    }

    #[test]
    fn test_find_shell_builtin() {
        assert_eq!(find_shell_builtin("h").map(|c| c.name), Some("history"));
        assert_eq!(find_shell_builtin("?").map(|c| c.name), Some("help"));
        assert!(find_shell_builtin("inbox").is_none());
        assert!(find_shell_builtin("wifi").is_none());
    }

    #[test]
    fn test_completion_words_sorted_and_unique() {
        let words = completion_words();
        assert!(words.contains(&"inbox"));
        assert!(words.contains(&"wifi"));
        assert!(!words.iter().any(|w| w.starts_with('*')));
        let mut sorted = words.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), words.len());
    }

    #[test]
    fn test_help_text_groups() {
        let help = help_text();
        assert!(help.contains("SHELL:"));
        assert!(help.contains("SERVICE CODES:"));
        assert!(syshelp_text().contains("NETWORK:"));
    }
}
