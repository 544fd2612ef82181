//! Path management for Mentra's files.

use mentra_core::ShellError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find config directory")]
    ConfigDirNotFound,
}

impl From<PathError> for ShellError {
    fn from(err: PathError) -> Self {
        ShellError::config(err.to_string())
    }
}

/// Resolves where Mentra keeps its files.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/mentra/            # Config directory (or --config-dir)
/// ├── config.toml              # Shell configuration
/// ├── aliases.toml             # Contact aliases
/// └── contacts.toml            # Contacts for the simulated device
/// ```
#[derive(Debug, Clone)]
pub struct MentraPaths {
    base: PathBuf,
}

impl MentraPaths {
    /// Uses `override_dir` when given, otherwise the platform config
    /// directory.
    pub fn new(override_dir: Option<PathBuf>) -> Result<Self, PathError> {
        let base = match override_dir {
            Some(dir) => dir,
            None => dirs::config_dir()
                .map(|dir| dir.join("mentra"))
                .ok_or(PathError::ConfigDirNotFound)?,
        };
        Ok(Self { base })
    }

    pub fn config_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn aliases_file(&self) -> PathBuf {
        self.base.join("aliases.toml")
    }

    pub fn contacts_file(&self) -> PathBuf {
        self.base.join("contacts.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_dir() {
        let paths = MentraPaths::new(Some(PathBuf::from("/tmp/m"))).unwrap();
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/m/config.toml"));
        assert_eq!(paths.aliases_file(), PathBuf::from("/tmp/m/aliases.toml"));
        assert_eq!(paths.contacts_file(), PathBuf::from("/tmp/m/contacts.toml"));
    }
}
