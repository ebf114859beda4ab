//! Runtime configuration for the resolution pipeline.
//!
//! Defaults target the public finance hosts. Every field can be overridden by
//! a `STRIKEPIN_*` environment variable or a `with_*` builder call.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::RESULT_CACHE_TTL;
use crate::token::{TokenSource, TOKEN_TTL};
use crate::ValidationError;

pub const DEFAULT_FINANCE_BASE_URL: &str = "https://finance.yahoo.com";
pub const DEFAULT_QUERY_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

const ENV_FINANCE_BASE_URL: &str = "STRIKEPIN_FINANCE_BASE_URL";
const ENV_QUERY_BASE_URL: &str = "STRIKEPIN_QUERY_BASE_URL";
const ENV_REMOTE_URL: &str = "STRIKEPIN_REMOTE_URL";
const ENV_TOKEN_TTL_SECS: &str = "STRIKEPIN_TOKEN_TTL_SECS";
const ENV_CACHE_TTL_SECS: &str = "STRIKEPIN_CACHE_TTL_SECS";
const ENV_TIMEOUT_MS: &str = "STRIKEPIN_TIMEOUT_MS";
const ENV_RATE_LIMIT_WAIT_MS: &str = "STRIKEPIN_RATE_LIMIT_WAIT_MS";
const ENV_COMPUTE_MODE: &str = "STRIKEPIN_COMPUTE_MODE";

/// Where max pain is computed once the options document is in hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeMode {
    /// In-process calculation.
    #[default]
    Local,
    /// Raw document is posted to the remote worker's analyze endpoint.
    Remote,
}

impl ComputeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl FromStr for ComputeMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(ValidationError::InvalidConfig {
                key: ENV_COMPUTE_MODE,
                value: value.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub finance_base_url: String,
    pub query_base_url: String,
    pub remote_url: Option<String>,
    pub token_ttl: Duration,
    pub cache_ttl: Duration,
    pub overall_timeout: Duration,
    pub rate_limit_wait: Duration,
    pub request_timeout_ms: u64,
    pub compute_mode: ComputeMode,
    pub token_sources: Vec<TokenSource>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            finance_base_url: DEFAULT_FINANCE_BASE_URL.to_owned(),
            query_base_url: DEFAULT_QUERY_BASE_URL.to_owned(),
            remote_url: None,
            token_ttl: TOKEN_TTL,
            cache_ttl: RESULT_CACHE_TTL,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            compute_mode: ComputeMode::Local,
            token_sources: TokenSource::defaults(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with any `STRIKEPIN_*` variables set in the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = read(ENV_FINANCE_BASE_URL) {
            config.finance_base_url = url;
        }
        if let Some(url) = read(ENV_QUERY_BASE_URL) {
            config.query_base_url = url;
        }
        config.remote_url = read(ENV_REMOTE_URL);
        if let Some(raw) = read(ENV_TOKEN_TTL_SECS) {
            config.token_ttl = Duration::from_secs(parse_u64(ENV_TOKEN_TTL_SECS, &raw)?);
        }
        if let Some(raw) = read(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_u64(ENV_CACHE_TTL_SECS, &raw)?);
        }
        if let Some(raw) = read(ENV_TIMEOUT_MS) {
            config.overall_timeout = Duration::from_millis(parse_u64(ENV_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = read(ENV_RATE_LIMIT_WAIT_MS) {
            config.rate_limit_wait =
                Duration::from_millis(parse_u64(ENV_RATE_LIMIT_WAIT_MS, &raw)?);
        }
        if let Some(raw) = read(ENV_COMPUTE_MODE) {
            config.compute_mode = raw.parse()?;
        }

        Ok(config)
    }

    pub fn with_finance_base_url(mut self, url: impl Into<String>) -> Self {
        self.finance_base_url = url.into();
        self
    }

    pub fn with_query_base_url(mut self, url: impl Into<String>) -> Self {
        self.query_base_url = url.into();
        self
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn with_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.rate_limit_wait = wait;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_compute_mode(mut self, mode: ComputeMode) -> Self {
        self.compute_mode = mode;
        self
    }

    pub fn with_token_sources(mut self, sources: Vec<TokenSource>) -> Self {
        self.token_sources = sources;
        self
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ValidationError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidConfig {
            key,
            value: raw.to_owned(),
        })
}
