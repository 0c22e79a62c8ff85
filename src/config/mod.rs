use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable selecting the backend base URL.
pub const API_URL_ENV: &str = "RIDEBOOK_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `https://rides.example.com/api`.
    /// Left unset, every backend request fails as misconfigured.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted `token` and `user` entries
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Runs before logging is set up, so it reports nothing itself; see
    /// [`Config::source_note`].
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            Ok(Config::default())
        }
    }

    /// Where the configuration came from, for logging once the subscriber is up.
    pub fn source_note(path: &Path) -> String {
        if path.exists() {
            format!("Loaded configuration from {}", path.display())
        } else {
            "No config file found, using defaults".to_string()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.api.base_url = normalize_base_url(config.api.base_url.take());
        Ok(config)
    }

    /// Apply the base URL override. Empty values are ignored.
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = normalize_base_url(url) {
            self.api.base_url = Some(url);
        }
        self
    }

    /// Apply `RIDEBOOK_API_URL` from the process environment.
    pub fn apply_env(self) -> Self {
        let url = std::env::var(API_URL_ENV).ok();
        self.with_api_url(url)
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.storage.data_dir = dir;
        }
        self
    }

    /// Warn once at startup when no backend is configured. Requests still
    /// fail individually, this only makes the cause visible in the logs.
    pub fn check(&self) {
        if self.api.base_url.is_none() {
            warn!(
                "No backend base URL configured; set [api] base_url or {}",
                API_URL_ENV
            );
        }
    }
}

fn normalize_base_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
}
