//! Ingest configuration
//!
//! Defaults are compiled in; `MDEX_*` environment variables (optionally
//! from a `.env` file) override them.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Base URL of the remote REST API.
pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";

/// Root directory of all persisted output.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Maximum number of per-ID tasks in flight.
pub const CONCURRENCY: usize = 30;

/// Attempts per ID before giving up.
pub const MAX_RETRY: u32 = 5;

/// Delay before the first retry; doubled for each further attempt.
pub const BASE_BACKOFF_MS: u64 = 500;

/// Page size requested from list endpoints.
pub const LIST_PAGE_LIMIT: u32 = 50;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Language tag used to pick localized species names.
pub const DEFAULT_LANGUAGE: &str = "ja-Hrkt";

const USER_AGENT: &str = concat!("monsterdex-ingest/", env!("CARGO_PKG_VERSION"));

/// Configuration shared by every ingest stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// API base URL without trailing slash
    pub api_base: String,

    /// Root of the `data/` tree
    pub data_dir: PathBuf,

    pub concurrency: usize,

    pub max_retries: u32,

    pub backoff_base_ms: u64,

    pub page_limit: u32,

    pub timeout_secs: u64,

    /// Language tag for localized names
    pub language: String,

    pub user_agent: String,

    /// Draw progress bars on stderr
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            concurrency: CONCURRENCY,
            max_retries: MAX_RETRY,
            backoff_base_ms: BASE_BACKOFF_MS,
            page_limit: LIST_PAGE_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            language: DEFAULT_LANGUAGE.to_string(),
            user_agent: USER_AGENT.to_string(),
            show_progress: false,
        }
    }
}

impl IngestConfig {
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Load defaults, then apply `.env` and `MDEX_*` overrides
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = IngestConfig::default();
        let config = IngestConfig {
            api_base: std::env::var("MDEX_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            data_dir: std::env::var("MDEX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            concurrency: parse_env("MDEX_CONCURRENCY")?.unwrap_or(defaults.concurrency),
            max_retries: parse_env("MDEX_MAX_RETRY")?.unwrap_or(defaults.max_retries),
            backoff_base_ms: parse_env("MDEX_BACKOFF_MS")?.unwrap_or(defaults.backoff_base_ms),
            page_limit: parse_env("MDEX_PAGE_LIMIT")?.unwrap_or(defaults.page_limit),
            timeout_secs: parse_env("MDEX_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs),
            language: std::env::var("MDEX_LANGUAGE").unwrap_or(defaults.language),
            user_agent: defaults.user_agent,
            show_progress: parse_env("MDEX_PROGRESS")?.unwrap_or(defaults.show_progress),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.is_empty() {
            return Err(IngestError::Config("API base URL cannot be empty".to_string()));
        }

        if self.concurrency == 0 {
            return Err(IngestError::Config("Concurrency must be greater than 0".to_string()));
        }

        if self.max_retries == 0 {
            return Err(IngestError::Config("Max retries must be greater than 0".to_string()));
        }

        if self.page_limit == 0 {
            return Err(IngestError::Config("Page limit must be greater than 0".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(IngestError::Config("Timeout must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// First page URL of a list endpoint
    pub fn list_url(&self, endpoint: &str) -> String {
        format!("{}/{}?limit={}", self.api_base, endpoint, self.page_limit)
    }

    /// Detail URL of one resource
    pub fn resource_url(&self, endpoint: &str, id: u32) -> String {
        format!("{}/{}/{}", self.api_base, endpoint, id)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::Config(format!("{key} has invalid value '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Builder for IngestConfig
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    api_base: Option<String>,
    data_dir: Option<PathBuf>,
    concurrency: Option<usize>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
    page_limit: Option<u32>,
    timeout_secs: Option<u64>,
    language: Option<String>,
    show_progress: Option<bool>,
}

impl IngestConfigBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn backoff_base_ms(mut self, ms: u64) -> Self {
        self.backoff_base_ms = Some(ms);
        self
    }

    pub fn page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = Some(show);
        self
    }

    pub fn build(self) -> IngestConfig {
        let defaults = IngestConfig::default();
        IngestConfig {
            api_base: self.api_base.unwrap_or(defaults.api_base),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            backoff_base_ms: self.backoff_base_ms.unwrap_or(defaults.backoff_base_ms),
            page_limit: self.page_limit.unwrap_or(defaults.page_limit),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            language: self.language.unwrap_or(defaults.language),
            user_agent: defaults.user_agent,
            show_progress: self.show_progress.unwrap_or(defaults.show_progress),
        }
    }
}
