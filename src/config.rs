//! Configuration types for feedsync

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Main configuration for feedsync
///
/// Every field has a serde default, so an empty document deserializes into a
/// working configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream platform API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Refresh, history crawl and bulk refresh behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Retry configuration for transient upstream failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Daily credential quarantine settings
    #[serde(default)]
    pub quarantine: QuarantineConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Check the configuration for values the orchestrator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sync.page_size == 0 {
            return Err(config_error("page size must be at least 1", "sync.page_size"));
        }
        if self.sync.candidate_limit == 0 {
            return Err(config_error(
                "candidate limit must be at least 1",
                "sync.candidate_limit",
            ));
        }
        if self.sync.max_refresh_rounds == 0 {
            return Err(config_error(
                "bulk refresh needs at least one round",
                "sync.max_refresh_rounds",
            ));
        }
        if url::Url::parse(&self.upstream.base_url).is_err() {
            return Err(config_error(
                format!("invalid upstream base URL: {}", self.upstream.base_url),
                "upstream.base_url",
            ));
        }
        let markers = &self.upstream.markers;
        for (marker, key) in [
            (&markers.auth_expired, "upstream.markers.auth_expired"),
            (&markers.rate_limited, "upstream.markers.rate_limited"),
            (&markers.bad_request, "upstream.markers.bad_request"),
        ] {
            if marker.trim().is_empty() {
                return Err(config_error("error marker must not be empty", key));
            }
        }
        if !(-23..=23).contains(&self.quarantine.utc_offset_hours) {
            return Err(config_error(
                "UTC offset must be between -23 and 23 hours",
                "quarantine.utc_offset_hours",
            ));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// Upstream platform API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the platform API (default: "http://localhost:3000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single upstream call (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Markers the upstream embeds in failure messages
    #[serde(default)]
    pub markers: ErrorMarkers,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            markers: ErrorMarkers::default(),
        }
    }
}

/// Substrings identifying upstream failure kinds in a response message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarkers {
    /// Credential expired; the credential is disabled permanently
    #[serde(default = "default_auth_expired_marker")]
    pub auth_expired: String,

    /// Credential throttled
    #[serde(default = "default_rate_limited_marker")]
    pub rate_limited: String,

    /// Malformed request; triggers the fixed penalty delay
    #[serde(default = "default_bad_request_marker")]
    pub bad_request: String,
}

impl Default for ErrorMarkers {
    fn default() -> Self {
        Self {
            auth_expired: default_auth_expired_marker(),
            rate_limited: default_rate_limited_marker(),
            bad_request: default_bad_request_marker(),
        }
    }
}

/// How fetched articles are written to storage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleWriteMode {
    /// Insert-or-update every article inside one atomic batch (default)
    #[default]
    Upsert,
    /// Bulk insert skipping duplicates, when the store supports it
    BulkInsert,
}

/// Sync orchestration configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Number of articles the upstream returns per full page (default: 20)
    ///
    /// A page shorter than this marks the end of a source's history.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of credentials drawn from storage per selection (default: 10)
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Delay between history crawl pages (default: 60 seconds)
    ///
    /// Also bounds how long a stop request takes to be observed.
    #[serde(default = "default_sync_delay", with = "duration_serde")]
    pub history_page_delay: Duration,

    /// Delay after each source during a bulk refresh round (default: 60 seconds)
    #[serde(default = "default_sync_delay", with = "duration_serde")]
    pub refresh_delay: Duration,

    /// Maximum number of pages a single history crawl walks (default: 1000)
    #[serde(default = "default_max_history_pages")]
    pub max_history_pages: u32,

    /// Maximum number of convergence rounds in a bulk refresh (default: 8)
    #[serde(default = "default_max_refresh_rounds")]
    pub max_refresh_rounds: u32,

    /// Article write strategy
    #[serde(default)]
    pub article_write_mode: ArticleWriteMode,

    /// Interval for the periodic bulk refresh (None = disabled)
    #[serde(default, with = "optional_duration_serde")]
    pub refresh_interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            candidate_limit: default_candidate_limit(),
            history_page_delay: default_sync_delay(),
            refresh_delay: default_sync_delay(),
            max_history_pages: default_max_history_pages(),
            max_refresh_rounds: default_max_refresh_rounds(),
            article_write_mode: ArticleWriteMode::default(),
            refresh_interval: None,
        }
    }
}

/// Retry configuration for transient upstream failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the first attempt (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 0 seconds)
    #[serde(default, with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Fixed wait after an upstream bad-request failure (default: 10 seconds)
    #[serde(default = "default_bad_request_penalty", with = "duration_serde")]
    pub bad_request_penalty: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: Duration::ZERO,
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            bad_request_penalty: default_bad_request_penalty(),
        }
    }
}

/// Daily credential quarantine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuarantineConfig {
    /// UTC offset of the reference zone that defines a quarantine day (default: +8)
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./feedsync.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_auth_expired_marker() -> String {
    "WeReadError401".to_string()
}

fn default_rate_limited_marker() -> String {
    "WeReadError429".to_string()
}

fn default_bad_request_marker() -> String {
    "WeReadError400".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_candidate_limit() -> usize {
    10
}

fn default_sync_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_max_history_pages() -> u32 {
    1000
}

fn default_max_refresh_rounds() -> u32 {
    8
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_bad_request_penalty() -> Duration {
    Duration::from_secs(10)
}

fn default_utc_offset_hours() -> i32 {
    8
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./feedsync.db")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
