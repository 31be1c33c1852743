//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the token store backend and the paths
//! the route guard and sign-in flow navigate to.
//!
//! Configuration is stored at `~/.config/koinsave/config.json`. Environment
//! variables override file values.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
use crate::guard::{DEFAULT_LANDING_PATH, SIGN_IN_PATH};

/// Application name used for config/storage directory paths
const APP_NAME: &str = "koinsave";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API used when neither the config file nor the environment name one
const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

const ENV_API_URL: &str = "KOINSAVE_API_URL";
const ENV_TOKEN_STORE: &str = "KOINSAVE_TOKEN_STORE";
const ENV_STORAGE_DIR: &str = "KOINSAVE_STORAGE_DIR";

/// Where the bearer token is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON key/value file in the storage directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only; nothing survives exit
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "keyring" => Ok(StoreBackend::Keyring),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token store '{}' (expected file, keyring or memory)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub token_store: StoreBackend,
    pub storage_dir: Option<PathBuf>,
    pub sign_in_path: String,
    pub default_landing_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_store: StoreBackend::default(),
            storage_dir: None,
            sign_in_path: SIGN_IN_PATH.to_string(),
            default_landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            debug!(?path, "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(backend) = lookup(ENV_TOKEN_STORE).filter(|v| !v.trim().is_empty()) {
            self.token_store = backend
                .parse()
                .with_context(|| format!("Invalid {}", ENV_TOKEN_STORE))?;
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR).filter(|v| !v.trim().is_empty()) {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory scoping the file token store.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Build the configured token store.
    pub fn open_store(&self) -> Result<Arc<dyn TokenStore>> {
        let store: Arc<dyn TokenStore> = match self.token_store {
            StoreBackend::File => Arc::new(FileTokenStore::new(self.storage_dir()?)),
            StoreBackend::Keyring => Arc::new(KeyringTokenStore::new()),
            StoreBackend::Memory => Arc::new(MemoryTokenStore::new()),
        };
        debug!(backend = ?self.token_store, "Token store opened");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "koinsave-config-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.token_store, StoreBackend::File);
        assert_eq!(config.sign_in_path, "/signin");
        assert_eq!(config.default_landing_path, "/dashboard");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = temp_dir("missing");
        let config = Config::load_from(&dir.join(CONFIG_FILE)).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = temp_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, r#"{"token_store":"keyring","sign_in_path":"/login"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.token_store, StoreBackend::Keyring);
        assert_eq!(config.sign_in_path, "/login");
        assert_eq!(config.default_landing_path, "/dashboard");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = temp_dir("roundtrip");
        let path = dir.join(CONFIG_FILE);
        let config = Config {
            api_base_url: "https://api.koinsave.example".to_string(),
            token_store: StoreBackend::Memory,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://api.koinsave.example");
        assert_eq!(loaded.token_store, StoreBackend::Memory);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let dir = temp_dir("invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, "{").unwrap();
        assert!(Config::load_from(&path).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_URL, "https://override.example/api"),
            (ENV_TOKEN_STORE, "Memory"),
            (ENV_STORAGE_DIR, "/tmp/koinsave-profile"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base_url, "https://override.example/api");
        assert_eq!(config.token_store, StoreBackend::Memory);
        assert_eq!(
            config.storage_dir().unwrap(),
            PathBuf::from("/tmp/koinsave-profile")
        );
    }

    #[test]
    fn test_invalid_store_override() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(|key| (key == ENV_TOKEN_STORE).then(|| "floppy".to_string()))
            .is_err());
    }

    #[test]
    fn test_open_file_store_uses_storage_dir() {
        let dir = temp_dir("open-store");
        let config = Config {
            storage_dir: Some(dir.clone()),
            ..Default::default()
        };
        let store = config.open_store().unwrap();
        store.set("a.b.c").unwrap();
        assert_eq!(
            FileTokenStore::new(dir.clone()).get().unwrap().as_deref(),
            Some("a.b.c")
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
