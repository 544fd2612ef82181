use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed shell command.
///
/// Created once per input line and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Command {
    /// The original input line, untouched.
    pub raw: String,
    /// Lowercased first token; empty for blank input.
    pub verb: String,
    /// First non-flag argument.
    pub target: Option<String>,
    /// Remaining non-flag arguments joined by single spaces.
    pub entity: Option<String>,
    /// `--key[=value]` flags; bare flags map to `"true"`.
    pub flags: BTreeMap<String, String>,
}

impl Command {
    pub fn is_empty(&self) -> bool {
        self.verb.is_empty()
    }

    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    /// Target and entity joined back together, if either is present.
    pub fn arguments(&self) -> Option<String> {
        match (&self.target, &self.entity) {
            (Some(t), Some(e)) => Some(format!("{} {}", t, e)),
            (Some(t), None) => Some(t.clone()),
            (None, Some(e)) => Some(e.clone()),
            (None, None) => None,
        }
    }
}
