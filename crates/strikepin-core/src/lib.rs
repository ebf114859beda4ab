//! # Strikepin Core
//!
//! Crumb acquisition, options fetching, and the max-pain fallback pipeline.
//!
//! ## Overview
//!
//! Resolving a ticker walks a fixed chain:
//!
//! - **Crumb** from the [`TokenStore`], scraped from a quote page when absent or stale
//! - **Options chain** for the nearest expiration, authenticated with the crumb
//! - **Max pain** computed in-process or by the remote worker
//! - **Fallbacks** to a cached result and finally a deterministic synthetic estimate
//!
//! Every result carries the [`ResultSource`] tier that produced it.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL result cache keyed by `max-pain:{SYMBOL}` |
//! | [`calculator`] | Pure max-pain computation and sentiment classification |
//! | [`config`] | Pipeline configuration and `STRIKEPIN_*` environment overrides |
//! | [`domain`] | Symbols, timestamps, chains, and results |
//! | [`error`] | Per-stage error types |
//! | [`fetcher`] | Options chain retrieval and parsing |
//! | [`http_client`] | HTTP client abstraction |
//! | [`orchestrator`] | The fallback chain |
//! | [`remote`] | Remote computation worker client |
//! | [`synthetic`] | Deterministic last-resort estimates |
//! | [`token`] | Crumb acquisition and storage |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strikepin_core::{Orchestrator, PipelineConfig, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::from_config(PipelineConfig::from_env()?);
//!     let result = orchestrator.resolve(&Symbol::parse("AAPL")?).await?;
//!     println!("{} max pain {} ({})", result.symbol, result.max_pain, result.source);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Only a rate limit escapes [`Orchestrator::resolve`]; every other failure is
//! absorbed by a fallback tier. Stage-level errors stay available to callers
//! that drive the components directly:
//!
//! ```rust
//! use strikepin_core::{FetchError, FetchErrorKind};
//!
//! fn handle_error(error: FetchError) {
//!     match error.kind() {
//!         FetchErrorKind::Unauthorized => {
//!             // Invalidate the crumb and retry once
//!         }
//!         FetchErrorKind::RateLimited => {
//!             // Back off before reporting
//!         }
//!         _ => {
//!             // Fall back to cached data
//!         }
//!     }
//! }
//! ```

pub mod cache;
pub mod calculator;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod orchestrator;
pub mod remote;
pub mod synthetic;
pub mod token;

// Caching
pub use cache::{cache_key, ResultCache, RESULT_CACHE_TTL};

// Configuration
pub use config::{ComputeMode, PipelineConfig};

// Domain models
pub use domain::{
    extract_tickers, MaxPainEstimate, MaxPainResult, OptionContract, OptionsChain, ResultSource,
    Sentiment, Symbol, UtcDateTime,
};

// Error types
pub use error::{
    AcquisitionError, CalculationError, CoreError, FetchError, FetchErrorKind, ResolveError,
    ValidationError,
};

// Options retrieval
pub use fetcher::{parse_options_response, FetchedOptions, OptionsFetcher, YahooOptionsFetcher};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Pipeline
pub use orchestrator::{Orchestrator, OrchestratorBuilder, PipelineStage, Resolution};

// Remote worker
pub use remote::RemotePeer;

// Crumbs
pub use token::{
    PageTokenAcquirer, Token, TokenAcquirer, TokenPattern, TokenSource, TokenStore, TOKEN_TTL,
};
