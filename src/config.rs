//! Configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; every field has a default.
//! `TIMELINE_DATABASE_URL` and `TIMELINE_DISABLE_CACHES` override the file.
//! Loading a `.env` file into the environment is left to the caller.

use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::BannerFilter;
use crate::error::{ConfigError, Result};

pub const DATABASE_URL_ENV: &str = "TIMELINE_DATABASE_URL";
pub const DISABLE_CACHES_ENV: &str = "TIMELINE_DISABLE_CACHES";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Diesel SQLite URL, e.g. `sqlite://timeline.db` or `:memory:`.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,
}

fn default_database_url() -> String {
    "sqlite://timeline.db".into()
}

const fn default_pool_size() -> u32 {
    5
}

const fn default_busy_timeout_ms() -> u32 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// When false, every request recomputes and nothing is stored.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_banner_kind")]
    pub banner_kind: i32,
    #[serde(default = "default_banner_subkind")]
    pub banner_subkind: i32,
    /// Banners starting less than this many seconds after the previous one
    /// ended continue its runs.
    #[serde(default = "default_continuation_threshold_secs")]
    pub continuation_threshold_secs: i64,
}

const fn default_banner_kind() -> i32 {
    3
}

const fn default_banner_subkind() -> i32 {
    1
}

const fn default_continuation_threshold_secs() -> i64 {
    10
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            banner_kind: default_banner_kind(),
            banner_subkind: default_banner_subkind(),
            continuation_threshold_secs: default_continuation_threshold_secs(),
        }
    }
}

impl IndexerConfig {
    #[must_use]
    pub fn filter(&self) -> BannerFilter {
        BannerFilter::new(self.banner_kind, self.banner_subkind)
    }

    #[must_use]
    pub fn continuation_threshold(&self) -> Duration {
        saturating_seconds(self.continuation_threshold_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposerConfig {
    /// Largest lapse folded into a surrounding window.
    #[serde(default = "default_max_gap_secs")]
    pub max_gap_secs: i64,
    /// Banner names that never label a window.
    #[serde(default = "default_suppressed_names")]
    pub suppressed_names: Vec<String>,
}

const fn default_max_gap_secs() -> i64 {
    3 * 24 * 60 * 60
}

fn default_suppressed_names() -> Vec<String> {
    vec!["プラチナオーディションガシャ".to_string()]
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: default_max_gap_secs(),
            suppressed_names: default_suppressed_names(),
        }
    }
}

impl ComposerConfig {
    #[must_use]
    pub fn max_gap(&self) -> Duration {
        saturating_seconds(self.max_gap_secs)
    }
}

/// `Duration::seconds` clamped to the representable range instead of panicking.
fn saturating_seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 { Duration::MIN } else { Duration::MAX })
}

fn check_seconds(field: &'static str, secs: i64) -> Result<()> {
    if secs < 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be negative".into(),
        }
        .into());
    }
    if Duration::try_seconds(secs).is_none() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("{secs} seconds is out of range"),
        }
        .into());
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_max_attempts() -> u32 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without environment overrides.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Build configuration from defaults and the environment only.
    ///
    /// # Errors
    /// Returns an error if the overridden configuration is invalid.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            self.database.url = url;
        }
        if std::env::var(DISABLE_CACHES_ENV).is_ok_and(|v| !v.is_empty()) {
            self.cache.enabled = false;
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingField { field: "database.url" }.into());
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.pool_size",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        check_seconds(
            "indexer.continuation_threshold_secs",
            self.indexer.continuation_threshold_secs,
        )?;
        check_seconds("composer.max_gap_secs", self.composer.max_gap_secs)?;
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
