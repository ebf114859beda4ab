//! # Domain Models
//!
//! Canonical types flowing through the strikepin pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated, uppercase ticker |
//! | [`OptionContract`] | One strike with its open interest |
//! | [`OptionsChain`] | Nearest-expiration calls and puts plus the underlying price |
//! | [`MaxPainEstimate`] | Computed estimate before it is tagged with a source |
//! | [`MaxPainResult`] | Estimate tagged with [`ResultSource`] as handed to callers |
//! | [`Sentiment`] | Price-vs-max-pain classification |
//! | [`UtcDateTime`] | RFC3339 UTC timestamp |
//!
//! Chains and results are immutable once built; the orchestrator re-tags a
//! cached result by producing a new value rather than mutating the stored one.

mod models;
mod symbol;
mod timestamp;

pub use models::{
    MaxPainEstimate, MaxPainResult, OptionContract, OptionsChain, ResultSource, Sentiment,
};
pub use symbol::{extract_tickers, Symbol};
pub use timestamp::UtcDateTime;
