//! Application configuration management.
//!
//! Configuration is stored at `~/.config/bankbot/config.json`. Environment
//! variables override the file: `BANKBOT_API` sets the base URL and
//! `BANKBOT_LOCALE` the locale.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "bankbot";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL used when nothing is configured (local development server)
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

const DEFAULT_LOCALE: &str = crate::auth::session::DEFAULT_LOCALE;

pub const ENV_API: &str = "BANKBOT_API";
pub const ENV_LOCALE: &str = "BANKBOT_LOCALE";

/// Where the credential survives restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub locale: String,
    pub token_store: TokenStoreKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            locale: DEFAULT_LOCALE.to_string(),
            token_store: TokenStoreKind::default(),
        }
    }
}

impl Config {
    /// Load from disk (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(locale) = lookup(ENV_LOCALE).filter(|v| !v.is_empty()) {
            self.locale = locale;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_store {
            TokenStoreKind::File => Arc::new(FileTokenStore::new(self.cache_dir()?)),
            TokenStoreKind::Keyring => Arc::new(KeyringTokenStore),
            TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        })
    }
}
