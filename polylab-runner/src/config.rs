//! Runner configuration, loaded from TOML.
//!
//! ```toml
//! [engine]
//! history_window = 48
//!
//! [cache]
//! dir = ".cache/backtest"
//! max_age_secs = 604800
//! max_entries = 500
//!
//! [provider]
//! base_url = "https://api.polymarketdata.co"
//! api_key_env = "PMD_API_KEY"
//! timeout_secs = 30
//! retry_on_rate_limit = true
//! page_limit = 200
//!
//! [run]
//! resolution = "1h"
//! stop_loss = 0.05
//! take_profit = 0.10
//! hold_periods = 24
//! fee_rate = 0.0
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Every section and field is optional; omitted values take the defaults
//! above (the cache bounds default to unbounded).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use polylab_core::data::{BlobCache, CachePolicy, HttpProviderConfig};
use polylab_core::engine::{RunParams, DEFAULT_HISTORY_WINDOW};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub engine: EngineSection,
    pub cache: CacheSection,
    pub provider: ProviderSection,
    pub run: RunSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Bars of history handed to strategies; also the warm-up length.
    pub history_window: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// `None` disables the disk cache.
    pub dir: Option<PathBuf>,
    pub max_age_secs: Option<u64>,
    pub max_entries: Option<usize>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from(".cache/backtest")),
            max_age_secs: None,
            max_entries: None,
        }
    }
}

impl CacheSection {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            max_age: self.max_age_secs.map(Duration::from_secs),
            max_entries: self.max_entries,
        }
    }

    pub fn build(&self) -> Option<BlobCache> {
        self.dir
            .as_ref()
            .map(|dir| BlobCache::with_policy(dir, self.policy()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub base_url: String,
    /// Environment variable holding the API key; the key itself never lives
    /// in the config file.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub retry_on_rate_limit: bool,
    pub page_limit: u32,
}

impl Default for ProviderSection {
    fn default() -> Self {
        let http = HttpProviderConfig::default();
        Self {
            base_url: http.base_url,
            api_key_env: "PMD_API_KEY".to_string(),
            timeout_secs: http.timeout_secs,
            retry_on_rate_limit: http.retry_on_rate_limit,
            page_limit: http.page_limit,
        }
    }
}

impl ProviderSection {
    /// HTTP provider settings with the API key read from `api_key_env`.
    pub fn http_config(&self) -> Result<HttpProviderConfig, ConfigError> {
        let api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))?;
        Ok(self.http_config_with_key(api_key))
    }

    pub fn http_config_with_key(&self, api_key: impl Into<String>) -> HttpProviderConfig {
        HttpProviderConfig {
            base_url: self.base_url.clone(),
            api_key: api_key.into(),
            timeout_secs: self.timeout_secs,
            retry_on_rate_limit: self.retry_on_rate_limit,
            page_limit: self.page_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub resolution: String,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub hold_periods: usize,
    pub fee_rate: f64,
}

impl Default for RunSection {
    fn default() -> Self {
        let params = RunParams::default();
        Self {
            resolution: "1h".to_string(),
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
            hold_periods: params.hold_periods,
            fee_rate: params.fee_rate,
        }
    }
}

impl RunSection {
    pub fn params(&self) -> RunParams {
        RunParams {
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            hold_periods: self.hold_periods,
            fee_rate: self.fee_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RunnerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.history_window == 0 {
            return Err(ConfigError::Invalid(
                "engine.history_window must be at least 1".into(),
            ));
        }
        if self.run.resolution.trim().is_empty() {
            return Err(ConfigError::Invalid("run.resolution must not be empty".into()));
        }
        if !(self.run.stop_loss > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "run.stop_loss must be positive, got {}",
                self.run.stop_loss
            )));
        }
        if !(self.run.take_profit > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "run.take_profit must be positive, got {}",
                self.run.take_profit
            )));
        }
        if self.run.hold_periods == 0 {
            return Err(ConfigError::Invalid(
                "run.hold_periods must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.run.fee_rate) {
            return Err(ConfigError::Invalid(format!(
                "run.fee_rate must be in [0, 1), got {}",
                self.run.fee_rate
            )));
        }
        if self.provider.page_limit == 0 {
            return Err(ConfigError::Invalid(
                "provider.page_limit must be at least 1".into(),
            ));
        }
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn run_params(&self) -> RunParams {
        self.run.params()
    }
}
