//! upgrid Configuration Module
//!
//! Config is stored in `~/.config/upgrid/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`UP_API_BASE_URL`, `UP_MAX_RECORDS`, `UP_CACHE_PATH`)
//! 2. Config file (`~/.config/upgrid/config.toml`)
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, UpError};
use crate::token_store::DEFAULT_TOKEN_TTL;

/// Up API v1 root; resource paths are appended to it
pub const DEFAULT_BASE_URL: &str = "https://api.up.com.au/api/v1/";

/// Records accumulated across pages before pagination stops
pub const DEFAULT_MAX_RECORDS: usize = 200;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub token: TokenSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Cap on records fetched across all pages
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSettings {
    /// Token lifetime after `upgrid login`, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Token cache file (defaults to `cache.json` next to the config)
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            cache_path: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_records() -> usize {
    DEFAULT_MAX_RECORDS
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL.as_secs()
}

impl UpConfig {
    /// Get the config directory path
    ///
    /// Returns `~/.config/upgrid/` on Unix, `%APPDATA%/upgrid/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("upgrid")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default path; see [`UpConfig::load_from`]
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| UpError::Config {
            reason: format!("Failed to read config file: {}", e),
        })?;

        toml::from_str(&content).map_err(|e| UpError::Config {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Save configuration to file, creating the directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| UpError::Config {
                    reason: format!("Failed to create config directory: {}", e),
                })?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| UpError::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| UpError::Config {
            reason: format!("Failed to write config file: {}", e),
        })
    }

    /// Merge with process environment variables
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Merge with variables from `lookup`. Empty values are ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("UP_API_BASE_URL") {
            self.api.base_url = url;
        }

        if let Some(max) = get("UP_MAX_RECORDS") {
            self.api.max_records = max.trim().parse().map_err(|_| UpError::Config {
                reason: format!("UP_MAX_RECORDS must be a positive integer, got '{}'", max),
            })?;
        }

        if let Some(path) = get("UP_CACHE_PATH") {
            self.token.cache_path = Some(PathBuf::from(path));
        }

        Ok(self)
    }

    /// Parsed base URL, normalised to end with `/` so paths join under it
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.api.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }

    pub fn max_records(&self) -> usize {
        self.api.max_records
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token.ttl_secs)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.token
            .cache_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("cache.json"))
    }

    /// Reject values the fetch engine cannot work with
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.api.max_records == 0 {
            return Err(UpError::Config {
                reason: "api.max_records must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Mask a token for display
///
/// Shows the first N chars + asterisks, e.g. "up:yeah:***"
pub fn mask_token(token: &str, visible_chars: usize) -> String {
    if token.is_empty() {
        return String::new();
    }

    let visible: String = token.chars().take(visible_chars).collect();
    format!("{}***", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_path_contains_upgrid() {
        let path = UpConfig::config_path();
        assert!(path.to_string_lossy().contains("upgrid"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = UpConfig::default();
        assert_eq!(config.api.base_url, "https://api.up.com.au/api/v1/");
        assert_eq!(config.max_records(), 200);
        assert_eq!(config.token_ttl(), Duration::from_secs(86_400));
        assert!(config.cache_path().ends_with("cache.json"));
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("upgrid").join("config.toml");

        let config = UpConfig {
            api: ApiSettings {
                base_url: "http://localhost:9000/api/v1/".into(),
                max_records: 1000,
            },
            token: TokenSettings {
                ttl_secs: 3600,
                cache_path: Some(temp_dir.path().join("cache.json")),
            },
        };

        config.save_to(&path).unwrap();
        let loaded = UpConfig::load_from(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[api]\nmax_records = 50\n").unwrap();

        let config = UpConfig::load_from(&path).unwrap();

        assert_eq!(config.max_records(), 50);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token.ttl_secs, 86_400);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[api\nmax_records = ").unwrap();

        let err = UpConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, UpError::Config { .. }));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = UpConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, UpConfig::default());
    }

    #[test]
    fn test_env_overrides_config() {
        let config = UpConfig::default()
            .with_env_from(env(&[
                ("UP_API_BASE_URL", "http://127.0.0.1:1234/v1"),
                ("UP_MAX_RECORDS", "1000"),
                ("UP_CACHE_PATH", "/tmp/upgrid-cache.json"),
            ]))
            .unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:1234/v1");
        assert_eq!(config.max_records(), 1000);
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/upgrid-cache.json"));
    }

    #[test]
    fn test_env_does_not_override_with_empty() {
        let config = UpConfig::default()
            .with_env_from(env(&[("UP_API_BASE_URL", "")]))
            .unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_bad_max_records_env() {
        let err = UpConfig::default()
            .with_env_from(env(&[("UP_MAX_RECORDS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("UP_MAX_RECORDS"));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = UpConfig {
            api: ApiSettings {
                base_url: "http://localhost:8080/api/v1".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.base_url().unwrap().join("tags").unwrap().as_str(),
            "http://localhost:8080/api/v1/tags"
        );
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = UpConfig::default();
        config.api.max_records = 0;
        assert!(config.validate().is_err());
        assert!(UpConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("up:yeah:abcdefghij", 8), "up:yeah:***");
        assert_eq!(mask_token("short", 10), "short***");
        assert_eq!(mask_token("", 10), "");
    }
}
