use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debounce::DEFAULT_QUIESCENCE;
use crate::poll::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable that wins over the stored backend URL
pub const BASE_URL_ENV: &str = "RAGCV_BASE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub debounce_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub auto_refresh: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Backend URL: `RAGCV_BASE_URL`, then the config file, then localhost
    pub fn base_url(&self) -> String {
        self.resolve_base_url(std::env::var(BASE_URL_ENV).ok())
    }

    fn resolve_base_url(&self, from_env: Option<String>) -> String {
        from_env
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh.unwrap_or(false)
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::default();
        if let Some(ms) = self.debounce_ms {
            session = session.with_debounce(Duration::from_millis(ms));
        }
        if let Some(ms) = self.poll_interval_ms {
            session = session.with_poll_interval(Duration::from_millis(ms));
        }
        session
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragcv").join("config.json"))
    }
}

/// Timing knobs handed to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_QUIESCENCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SessionConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.session_config(), SessionConfig::default());
        assert!(!config.auto_refresh());
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://backend:9000".to_string()),
            debounce_ms: Some(250),
            poll_interval_ms: None,
            auto_refresh: Some(true),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.session_config(),
            SessionConfig::default().with_debounce(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_base_url_precedence() {
        let stored = Config {
            base_url: Some("http://stored:8000".to_string()),
            ..Config::new()
        };
        assert_eq!(stored.resolve_base_url(Some("http://env:1".to_string())), "http://env:1");
        assert_eq!(stored.resolve_base_url(Some("  ".to_string())), "http://stored:8000");
        assert_eq!(stored.resolve_base_url(None), "http://stored:8000");
        assert_eq!(Config::new().resolve_base_url(None), DEFAULT_BASE_URL);
    }
}
