//! Per-session shell state: environment, shell aliases, working directory
//! and bounded command history.

use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

use crate::command::Command;
use crate::result::ShellResult;

/// Default number of history entries kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

const DEFAULT_ENV: &[(&str, &str)] = &[
    ("HOME", "/"),
    ("USER", "default"),
    ("SHELL", "mentra"),
    ("LANG", "en_US"),
    ("PATH", "/bin:/usr/bin"),
    ("PWD", "/"),
];

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("ll", "ls -la"),
    ("la", "ls -a"),
    ("..", "cd .."),
    ("~", "cd /"),
    ("h", "history"),
    ("c", "clear"),
];

/// State for one shell session.
///
/// Mutated in place by the `cd`, `export` and `alias` built-ins and
/// replaced wholesale by [`SessionContext::reset`].
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: String,
    working_directory: String,
    env: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    history: VecDeque<Command>,
    history_limit: usize,
    last_command: Option<Command>,
    last_result: Option<ShellResult>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SessionContext {
    pub fn new(history_limit: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            working_directory: "/".to_string(),
            env: DEFAULT_ENV
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            last_command: None,
            last_result: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Replaces all state with a fresh session.
    pub fn reset(&mut self) {
        *self = Self::new(self.history_limit);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn add_to_history(&mut self, command: Command) {
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(command);
    }

    /// The most recent `n` commands, most recent first.
    pub fn get_history(&self, n: usize) -> Vec<&Command> {
        self.history.iter().rev().take(n).collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn last_command(&self) -> Option<&Command> {
        self.last_command.as_ref()
    }

    pub fn set_last_command(&mut self, command: Command) {
        self.last_command = Some(command);
    }

    pub fn last_result(&self) -> Option<&ShellResult> {
        self.last_result.as_ref()
    }

    pub fn set_last_result(&mut self, result: ShellResult) {
        self.last_result = Some(result);
    }

    // ------------------------------------------------------------------
    // Environment
    // ------------------------------------------------------------------

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn get_all_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    // ------------------------------------------------------------------
    // Shell aliases
    // ------------------------------------------------------------------

    pub fn set_alias(&mut self, name: impl Into<String>, expansion: impl Into<String>) {
        self.aliases.insert(name.into(), expansion.into());
    }

    pub fn get_alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn get_all_aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Expands the first word of `input` if it names an alias.
    pub fn resolve_alias(&self, input: &str) -> String {
        let trimmed = input.trim();
        let (head, tail) = match trimmed.split_once(char::is_whitespace) {
            Some((h, t)) => (h, Some(t.trim_start())),
            None => (trimmed, None),
        };
        match (self.aliases.get(head), tail) {
            (Some(expansion), Some(rest)) if !rest.is_empty() => format!("{} {}", expansion, rest),
            (Some(expansion), _) => expansion.clone(),
            (None, _) => input.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Working directory
    // ------------------------------------------------------------------

    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }

    /// Changes the logical working directory. No filesystem checks.
    pub fn change_directory(&mut self, path: &str) -> &str {
        self.working_directory = self.resolve_path(path);
        self.env
            .insert("PWD".to_string(), self.working_directory.clone());
        &self.working_directory
    }

    /// Resolves `path` against the working directory.
    ///
    /// Handles `.`, `..`, `~` and absolute paths purely lexically.
    pub fn resolve_path(&self, path: &str) -> String {
        let path = path.trim();
        let combined = match path {
            "" => self.working_directory.clone(),
            "~" => "/".to_string(),
            p if p.starts_with("~/") => p[1..].to_string(),
            p if p.starts_with('/') => p.to_string(),
            p => format!("{}/{}", self.working_directory, p),
        };
        normalize_path(&combined)
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Serializes env and aliases as `export K="V"` / `alias K="V"` lines.
    pub fn export_context(&self) -> String {
        let mut lines = Vec::with_capacity(self.env.len() + self.aliases.len());
        for (key, value) in &self.env {
            lines.push(format!("export {}=\"{}\"", key, value));
        }
        for (key, value) in &self.aliases {
            lines.push(format!("alias {}=\"{}\"", key, value));
        }
        lines.join("\n")
    }

    /// Loads lines produced by [`SessionContext::export_context`].
    ///
    /// Returns the number of entries applied; unrecognized lines are skipped.
    pub fn import_context(&mut self, text: &str) -> usize {
        let mut applied = 0;
        for line in text.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("export ") {
                if let Some((key, value)) = split_assignment(rest) {
                    self.set_env(key, value);
                    applied += 1;
                }
            } else if let Some(rest) = line.strip_prefix("alias ") {
                if let Some((key, value)) = split_assignment(rest) {
                    self.set_alias(key, value);
                    applied += 1;
                }
            }
        }
        if let Some(pwd) = self.env.get("PWD").cloned() {
            self.working_directory = normalize_path(&pwd);
        }
        applied
    }
}

/// Splits `K=V`, trimming both sides and stripping one layer of quotes.
pub(crate) fn split_assignment(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), strip_quotes(value.trim()).to_string()))
}

fn strip_quotes(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}
