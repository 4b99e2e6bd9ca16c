//! Configuration module for wpreader

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::wordpress::MAX_PER_PAGE;
use crate::cache::CacheSettings;
use crate::paths;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the WordPress site
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Number of articles requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on a single provider request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Encrypt the stored session with a machine-derived key
    #[serde(default = "default_seal_session")]
    pub seal_session: bool,
}

fn default_site_url() -> String {
    "https://lagosnawa.com".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_seal_session() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            seal_session: default_seal_session(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Cache tuning derived from this config. The page size is kept within
    /// what the REST API accepts.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            page_size: self.page_size.clamp(1, MAX_PER_PAGE),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "site_url = \"https://africanawa.com\"\npage_size = 30\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.site_url, "https://africanawa.com");
        assert_eq!(config.page_size, 30);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.seal_session);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = Config {
            page_size: 5,
            seal_session: false,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_cache_settings_never_zero() {
        let config = Config {
            page_size: 0,
            request_timeout_secs: 0,
            ..Config::default()
        };
        let settings = config.cache_settings();
        assert_eq!(settings.page_size, 1);
        assert_eq!(settings.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_page_size_capped_at_api_maximum() {
        let config = Config {
            page_size: 150,
            ..Config::default()
        };
        assert_eq!(config.cache_settings().page_size, 100);
    }
}
