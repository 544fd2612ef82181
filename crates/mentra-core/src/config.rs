use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration, stored as `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub shell: ShellSection,
    pub calling: CallingConfig,
    pub messaging: MessagingConfig,
    pub ussd: UssdConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ShellSection {
    pub history_limit: usize,
    pub command_timeout_ms: u64,
    pub prompt: String,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            command_timeout_ms: 30_000,
            prompt: "mentra> ".to_string(),
        }
    }
}

impl ShellSection {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CallingConfig {
    pub contact_search_limit: usize,
}

impl Default for CallingConfig {
    fn default() -> Self {
        Self {
            contact_search_limit: 10,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MessagingConfig {
    /// Ask before sending once recipient and body are known.
    pub confirm_before_send: bool,
    pub contact_search_limit: usize,
    pub inbox_limit: usize,
    pub thread_limit: usize,
    pub default_sim: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            confirm_before_send: false,
            contact_search_limit: 10,
            inbox_limit: 10,
            thread_limit: 20,
            default_sim: 0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UssdConfig {
    pub timeout_secs: u64,
    pub history_limit: usize,
}

impl Default for UssdConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            history_limit: 50,
        }
    }
}

impl UssdConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
