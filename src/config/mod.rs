use crate::core::path::{config_file, ensure_dir};
use crate::core::{CompressionAlgorithm, ShelfError, ShelfResult};
use crate::di::ConfigProvider;
use crate::storage::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// How many times a failed upload or download is retried
    /// (so `max_retry + 1` attempts in total)
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    /// Fixed pause between attempts, in seconds
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Upper bound on dependencies resolved at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Skip content hashing when checking installed packages
    /// (only file presence, sizes and versions are compared)
    #[serde(default)]
    pub quick_verify: bool,

    /// Compression used by `publish` when none is given
    /// - "zstd" (default), "gzip", "zip" or "none"
    #[serde(default)]
    pub compression: CompressionAlgorithm,

    /// Timeout for a single HTTP request, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_max_retry() -> u32 {
    4
}

fn default_retry_backoff_secs() -> u64 {
    3
}

fn default_max_concurrent() -> usize {
    8
}

fn default_http_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retry: default_max_retry(),
            retry_backoff_secs: default_retry_backoff_secs(),
            max_concurrent: default_max_concurrent(),
            quick_verify: false,
            compression: CompressionAlgorithm::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config from the Shelf home directory, creating the default if it doesn't exist
    ///
    /// Config locations (unless `$SHELF_HOME` is set):
    /// - Windows: %APPDATA%\shelf\config.yaml
    /// - Linux: ~/.config/shelf/config.yaml
    /// - macOS: ~/Library/Application Support/shelf/config.yaml
    pub fn load() -> ShelfResult<Self> {
        Self::load_from(&config_file()?)
    }

    /// Load config from an explicit path, creating the default if it doesn't exist
    pub fn load_from(config_path: &Path) -> ShelfResult<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(config_path)?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ShelfError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Save config to the Shelf home directory
    pub fn save(&self) -> ShelfResult<()> {
        self.save_to(&config_file()?)
    }

    pub fn save_to(&self, config_path: &Path) -> ShelfResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ShelfError::Path("Invalid config path".to_string()))?;
        ensure_dir(config_dir)?;

        let content = serde_yaml::to_string(self)
            .map_err(|e| ShelfError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, content)?;
        Ok(())
    }

    fn validate(&self) -> ShelfResult<()> {
        if self.max_concurrent == 0 {
            return Err(ShelfError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ShelfError::Config(
                "http_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ConfigProvider for Config {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry, Duration::from_secs(self.retry_backoff_secs))
    }

    fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    fn quick_verify(&self) -> bool {
        self.quick_verify
    }

    fn compression(&self) -> CompressionAlgorithm {
        self.compression
    }

    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
