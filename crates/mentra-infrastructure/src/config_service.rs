//! Loads and caches `config.toml`.

use mentra_core::config::ShellConfig;
use mentra_core::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::storage::AtomicTomlFile;

/// Configuration service that loads the shell configuration once and
/// caches it.
#[derive(Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<ShellConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// The configuration, loading it on first access.
    ///
    /// A missing, blank or unreadable file yields the defaults; the
    /// last case is logged.
    pub fn get_config(&self) -> ShellConfig {
        if let Ok(guard) = self.config.read() {
            if let Some(cached) = guard.as_ref() {
                return cached.clone();
            }
        }

        let loaded = match self.load() {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Using default configuration");
                ShellConfig::default()
            }
        };

        if let Ok(mut guard) = self.config.write() {
            *guard = Some(loaded.clone());
        }
        loaded
    }

    /// Reads the file without touching the cache.
    pub fn load(&self) -> Result<ShellConfig> {
        Ok(self.file().load()?.unwrap_or_default())
    }

    /// Writes the defaults unless a file already exists. Returns whether
    /// a file was written.
    pub fn write_defaults(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.file().save(&ShellConfig::default())?;
        Ok(true)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.config.write() {
            *guard = None;
        }
    }

    fn file(&self) -> AtomicTomlFile<ShellConfig> {
        AtomicTomlFile::new(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(dir.path().join("config.toml"));
        assert_eq!(service.get_config(), ShellConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[shell]\nprompt = \"$ \"\n\n[messaging]\nconfirm_before_send = true\n",
        )
        .unwrap();

        let config = ConfigService::new(path).get_config();
        assert_eq!(config.shell.prompt, "$ ");
        assert_eq!(config.shell.history_limit, 1000);
        assert!(config.messaging.confirm_before_send);
        assert_eq!(config.ussd.timeout_secs, 30);
    }

    #[test]
    fn test_cache_and_invalidate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let service = ConfigService::new(path.clone());
        assert_eq!(service.get_config().logging.level, "warn");

        fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(service.get_config().logging.level, "warn");
        service.invalidate_cache();
        assert_eq!(service.get_config().logging.level, "debug");
    }

    #[test]
    fn test_write_defaults_once() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(dir.path().join("config.toml"));
        assert!(service.write_defaults().unwrap());
        assert!(!service.write_defaults().unwrap());
        assert_eq!(service.load().unwrap(), ShellConfig::default());
    }

    #[test]
    fn test_broken_file_is_an_error_but_get_config_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[shell\n").unwrap();
        let service = ConfigService::new(path);
        assert!(service.load().is_err());
        assert_eq!(service.get_config(), ShellConfig::default());
    }
}
