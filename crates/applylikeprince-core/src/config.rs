//! Application configuration management.
//!
//! Holds the backend URL, request timeout, session storage backend, log file
//! and last used email. Stored at `~/.config/applylikeprince/config.json`;
//! `APPLY_API_URL` overrides the stored URL.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::REQUEST_TIMEOUT_SECS;
use crate::auth::{EncryptedFileStorage, FileStorage, KeyringStorage, MemoryStorage, SessionStorage};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "applylikeprince";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing is configured (the dev server's default port)
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

pub const API_URL_ENV: &str = "APPLY_API_URL";
pub const PASSPHRASE_ENV: &str = "APPLY_SESSION_PASSPHRASE";

/// Where the session record is kept between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
    Encrypted,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keyring" => Ok(StorageKind::Keyring),
            "encrypted" => Ok(StorageKind::Encrypted),
            "memory" => Ok(StorageKind::Memory),
            other => bail!("Unknown storage backend: {} (expected file, keyring, encrypted or memory)", other),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout() -> u64 {
    REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_timeout(),
            storage: StorageKind::default(),
            log_file: None,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from disk (or defaults), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Open the configured session storage backend.
    pub fn session_storage(&self) -> Result<Arc<dyn SessionStorage>> {
        self.session_storage_with(|key| std::env::var(key).ok())
    }

    fn session_storage_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn SessionStorage>> {
        let storage: Arc<dyn SessionStorage> = match self.storage {
            StorageKind::File => Arc::new(FileStorage::in_dir(&self.data_dir()?)),
            StorageKind::Keyring => Arc::new(KeyringStorage::new()),
            StorageKind::Encrypted => {
                let passphrase = lookup(PASSPHRASE_ENV)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| anyhow!("{} must be set for encrypted session storage", PASSPHRASE_ENV))?;
                Arc::new(EncryptedFileStorage::in_dir(&self.data_dir()?, passphrase))
            }
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"storage":"keyring"}"#).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.storage, StorageKind::Keyring);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_env_overrides_api_url() {
        let mut config = Config::default();
        config.apply_env(|key| (key == API_URL_ENV).then(|| "https://apply.example/api".to_string()));
        assert_eq!(config.api_url, "https://apply.example/api");

        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.api_url, "https://apply.example/api");
    }

    #[test]
    fn test_storage_kind_from_str() {
        assert_eq!("Keyring".parse::<StorageKind>().unwrap(), StorageKind::Keyring);
        assert!("s3".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_encrypted_storage_requires_passphrase() {
        let config = Config {
            storage: StorageKind::Encrypted,
            ..Config::default()
        };
        assert!(config.session_storage_with(|_| None).is_err());
    }

    #[test]
    fn test_memory_storage_needs_no_setup() {
        let config = Config {
            storage: StorageKind::Memory,
            ..Config::default()
        };
        let storage = config.session_storage_with(|_| None).unwrap();
        assert!(storage.load().unwrap().is_none());
    }
}
