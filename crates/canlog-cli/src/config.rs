//! Configuration file management.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canlog_core::TokenPersistence;
use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default device base URL
    #[serde(default)]
    pub device_url: Option<String>,

    /// API token sent with every request
    #[serde(default)]
    pub token: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("canlog")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Keeps the API token in the config file.
///
/// Every store rewrites the file immediately, leaving other settings intact.
#[derive(Debug, Clone)]
pub struct FileTokenPersistence {
    path: PathBuf,
}

impl FileTokenPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileTokenPersistence {
    fn default() -> Self {
        Self::new(Config::path())
    }
}

impl TokenPersistence for FileTokenPersistence {
    fn load(&self) -> Option<String> {
        Config::load_from(&self.path)
            .token
            .filter(|t| !t.trim().is_empty())
    }

    fn store(&self, token: &str) -> io::Result<()> {
        let mut config = Config::load_from(&self.path);
        config.token = (!token.is_empty()).then(|| token.to_string());
        config.save_to(&self.path).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlog_core::TokenStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.device_url.is_none());
        assert!(config.token.is_none());
        assert!(!config.no_color);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            device_url: Some("http://192.168.4.1".to_string()),
            token: Some("secret".to_string()),
            no_color: true,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_missing_or_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load_from(&path), Config::default());

        fs::write(&path, "device_url = [").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_partial_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "device_url = \"http://logger.local\"\n").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.device_url.as_deref(), Some("http://logger.local"));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_token_persistence_keeps_other_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        Config {
            device_url: Some("http://logger.local".to_string()),
            ..Default::default()
        }
        .save_to(&path)
        .unwrap();

        let persistence = FileTokenPersistence::new(&path);
        assert!(persistence.load().is_none());

        persistence.store("abc123").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.token.as_deref(), Some("abc123"));
        assert_eq!(config.device_url.as_deref(), Some("http://logger.local"));

        persistence.store("").unwrap();
        assert!(Config::load_from(&path).token.is_none());
    }

    #[test]
    fn test_token_store_persists_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let store = TokenStore::new(Arc::new(FileTokenPersistence::new(&path)));
        assert!(store.get().is_none());
        store.set("  fresh  ").unwrap();

        // A new store sees the saved token.
        let reopened = TokenStore::new(Arc::new(FileTokenPersistence::new(&path)));
        assert_eq!(reopened.get().as_deref(), Some("fresh"));

        reopened.clear().unwrap();
        assert!(Config::load_from(&path).token.is_none());
    }
}
