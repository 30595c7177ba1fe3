//! Application configuration management.
//!
//! Configuration is stored at `~/.config/expensetrack/config.json`. The
//! service endpoints and API key can be overridden from the environment
//! (a `.env` file is honoured by the binary).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_IDENTITY_URL;
use crate::auth::{DEFAULT_SESSION_MINUTES, DEFAULT_VERIFICATION_POLL_SECS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "expensetrack";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_API_KEY: &str = "EXPENSETRACK_API_KEY";
const ENV_DATABASE_URL: &str = "EXPENSETRACK_DATABASE_URL";
const ENV_IDENTITY_URL: &str = "EXPENSETRACK_IDENTITY_URL";
const ENV_EMAIL: &str = "EXPENSETRACK_EMAIL";

fn default_session_minutes() -> i64 {
    DEFAULT_SESSION_MINUTES
}

fn default_poll_secs() -> u64 {
    DEFAULT_VERIFICATION_POLL_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub database_url: Option<String>,
    pub identity_url: Option<String>,
    pub last_email: Option<String>,
    #[serde(default = "default_session_minutes")]
    pub session_minutes: i64,
    #[serde(default = "default_poll_secs")]
    pub verification_poll_secs: u64,
    #[serde(default)]
    pub premium_theme: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            database_url: None,
            identity_url: None,
            last_email: None,
            session_minutes: DEFAULT_SESSION_MINUTES,
            verification_poll_secs: DEFAULT_VERIFICATION_POLL_SECS,
            premium_theme: false,
        }
    }
}

impl Config {
    /// Load the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `change` to the saved file only, so environment overrides are
    /// never written back.
    pub fn update_file(path: &Path, change: impl FnOnce(&mut Config)) -> Result<()> {
        let mut saved = Self::load_from(path)?;
        change(&mut saved);
        saved.save_to(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply non-empty values returned by `lookup` over the file values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = get(ENV_DATABASE_URL) {
            self.database_url = Some(v);
        }
        if let Some(v) = get(ENV_IDENTITY_URL) {
            self.identity_url = Some(v);
        }
        if let Some(v) = get(ENV_EMAIL) {
            self.last_email = Some(v);
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session and the log file.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn identity_url(&self) -> &str {
        self.identity_url.as_deref().unwrap_or(DEFAULT_IDENTITY_URL)
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No expense database configured. Set {} or database_url in {}",
                ENV_DATABASE_URL,
                CONFIG_FILE
            )
        })
    }

    /// Configured session length, never shorter than one minute.
    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_minutes.max(1))
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verification_poll_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session_duration(), chrono::Duration::minutes(5));
        assert_eq!(config.poll_interval(), std::time::Duration::from_secs(5));
        assert_eq!(config.identity_url(), DEFAULT_IDENTITY_URL);
        assert!(config.database_url().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            database_url: Some("https://db.example".to_string()),
            last_email: Some("a@b.com".to_string()),
            premium_theme: true,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key":"k","session_minutes":0}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.verification_poll_secs, 5);
        assert_eq!(config.session_duration(), chrono::Duration::minutes(1));
    }

    #[test]
    fn test_update_file_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key":"k","last_email":"a@b.com"}"#).unwrap();
        Config::update_file(&path, |c| c.premium_theme = true).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.premium_theme);
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.last_email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config {
            api_key: Some("file-key".to_string()),
            last_email: Some("old@b.com".to_string()),
            ..Config::default()
        };
        config.apply_overrides(|key| match key {
            "EXPENSETRACK_API_KEY" => Some("env-key".to_string()),
            "EXPENSETRACK_DATABASE_URL" => Some("https://db.example".to_string()),
            "EXPENSETRACK_EMAIL" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.database_url().unwrap(), "https://db.example");
        assert_eq!(config.last_email.as_deref(), Some("old@b.com"));
    }
}
