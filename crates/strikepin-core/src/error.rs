//! Error taxonomy for the acquisition and computation pipeline.
//!
//! Each stage owns its error type so the orchestrator can pick a recovery
//! path per failure class:
//!
//! | Error | Stage | Recovery |
//! |-------|-------|----------|
//! | [`AcquisitionError`] | crumb acquisition | next token source, then cache fallback |
//! | [`FetchError`] | options fetch | invalidate + one retry, backoff, or cache fallback |
//! | [`CalculationError`] | max-pain computation | cache fallback |
//! | [`ResolveError`] | whole pipeline | surfaced to the caller |

use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

/// Validation and configuration errors for strikepin inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid value '{value}' for {key}")]
    InvalidConfig { key: &'static str, value: String },
}

/// Failure to obtain a crumb from an upstream page.
///
/// None of these are fatal on their own; the caller moves on to the next
/// configured token source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("token page '{page}' request failed: {message}")]
    Transport { page: String, message: String },
    #[error("token page '{page}' returned status {status}")]
    Status { page: String, status: u16 },
    #[error("no crumb pattern matched in token page '{page}'")]
    NoTokenFound { page: String },
    #[error("all {attempted} token source(s) failed")]
    Exhausted { attempted: usize },
}

/// Classification of an options fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// 401/403: the crumb used for the call is stale.
    Unauthorized,
    /// 429: the caller must back off before trying again.
    RateLimited,
    /// Any other non-2xx status or transport failure.
    Upstream,
    /// 2xx with a body that does not have the expected shape.
    Malformed,
}

impl FetchErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthorized => "fetch.unauthorized",
            Self::RateLimited => "fetch.rate_limited",
            Self::Upstream => "fetch.upstream",
            Self::Malformed => "fetch.malformed",
        }
    }
}

/// Structured fetch error carrying its kind and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Unauthorized, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::RateLimited, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Upstream, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Malformed, message)
    }

    /// Maps a non-2xx HTTP status to its fetch error class.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::unauthorized(format!("upstream refused crumb with status {status}")),
            429 => Self::rate_limited("upstream rate limited the request (429)"),
            _ => Self::upstream(format!("upstream returned status {status}")),
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.code())
    }
}

impl std::error::Error for FetchError {}

/// Max-pain computation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalculationError {
    #[error("insufficient options data: {calls} call(s), {puts} put(s)")]
    InsufficientData { calls: usize, puts: usize },
    #[error("invalid options chain: {reason}")]
    InvalidChain { reason: &'static str },
}

/// The only failure `Orchestrator::resolve` reports to its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("rate limited while resolving {symbol}; waited {waited:?} before giving up")]
    RateLimited { symbol: String, waited: Duration },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
