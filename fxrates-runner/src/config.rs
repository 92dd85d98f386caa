//! Serializable pipeline configuration.
//!
//! Loaded from an optional TOML file. Every field has a default, so an empty
//! file (or no file) yields a working configuration apart from the initial
//! start date. `DATA_DIR` in the environment overrides `data_dir`.

use chrono::NaiveDate;
use fxrates_core::data::ecb::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use fxrates_core::data::RetryPolicy;
use fxrates_core::{Currency, CurrencySet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FxConfig {
    /// Directory holding `forex_rates.csv` and its sidecar.
    pub data_dir: PathBuf,

    /// Start of the very first fetch window, used when nothing is persisted.
    pub initial_start_date: Option<NaiveDate>,

    /// Subset of currencies to maintain. All supported currencies when unset.
    pub currencies: Option<Vec<Currency>>,

    pub source: SourceConfig,
    pub retry: RetryConfig,
    pub publish: PublishConfig,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            initial_start_date: None,
            currencies: None,
            source: SourceConfig::default(),
            retry: RetryConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

/// Upstream data service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry policy settings, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub multiplier_secs: f64,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub jitter_percent: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            multiplier_secs: p.multiplier.as_secs_f64(),
            min_delay_secs: p.min_delay.as_secs_f64(),
            max_delay_secs: p.max_delay.as_secs_f64(),
            jitter_percent: p.jitter_percent,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> Result<RetryPolicy, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        let secs = |name: &str, v: f64| {
            Duration::try_from_secs_f64(v)
                .map_err(|_| ConfigError::Invalid(format!("retry.{name} must be a non-negative number, got {v}")))
        };
        let min_delay = secs("min_delay_secs", self.min_delay_secs)?;
        let max_delay = secs("max_delay_secs", self.max_delay_secs)?;
        if min_delay > max_delay {
            return Err(ConfigError::Invalid(
                "retry.min_delay_secs exceeds retry.max_delay_secs".into(),
            ));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            multiplier: secs("multiplier_secs", self.multiplier_secs)?,
            min_delay,
            max_delay,
            jitter_percent: self.jitter_percent,
        })
    }
}

/// Chart publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// HTTP endpoint that accepts the chart array. Publishing over HTTP is
    /// disabled when unset.
    pub endpoint: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: "SUBSETS_API_KEY".to_string(),
        }
    }
}

impl FxConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(&self.currencies, Some(list) if list.is_empty()) {
            return Err(ConfigError::Invalid("currencies must not be empty".into()));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid("source.timeout_secs must be positive".into()));
        }
        self.retry.to_policy()?;
        Ok(())
    }

    /// The currencies to maintain, in code order.
    pub fn currency_set(&self) -> CurrencySet {
        match &self.currencies {
            Some(list) => CurrencySet::new(list.iter().copied()),
            None => CurrencySet::all(),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(format!("serialize config: {e}")))
    }
}
