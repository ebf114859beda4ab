//! CLI argument definitions for strikepin.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `resolve` | Resolve max pain for symbols through the full fallback chain |
//! | `compute` | Compute max pain from a saved options document, offline |
//! | `scan` | Find `$TICKER` cashtags in text |
//! | `synthetic` | Print the deterministic fallback estimate for a symbol |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `8000` | Overall live-resolution budget in ms |
//! | `--remote-url` | unset | Remote worker base URL |
//! | `--compute-mode` | `local` | Where max pain is computed |
//! | `--verbose` | `false` | Debug-level logs on stderr |
//!
//! # Examples
//!
//! ```bash
//! strikepin resolve AAPL TSLA --pretty
//! strikepin compute --file aapl-options.json
//! strikepin scan 'Watching $NVDA and $AMD into close' --resolve
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strikepin_core::ComputeMode;

/// Max-pain levels for US equity options, with cached and synthetic fallbacks.
#[derive(Debug, Parser)]
#[command(name = "strikepin", version, about)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Overall budget for the live path in milliseconds.
    ///
    /// Falls back to `STRIKEPIN_TIMEOUT_MS`, then 8000.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Base URL of the remote computation worker; overrides `STRIKEPIN_REMOTE_URL`.
    #[arg(long, global = true)]
    pub remote_url: Option<String>,

    /// Where max pain is computed once options data is fetched.
    #[arg(long, global = true, value_enum)]
    pub compute_mode: Option<ComputeModeArg>,

    /// Emit debug logs on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve max pain for one or more symbols.
    Resolve(ResolveArgs),
    /// Compute max pain from a raw options JSON document.
    Compute(ComputeArgs),
    /// Find cashtags in free text.
    Scan(ScanArgs),
    /// Print the deterministic synthetic estimate for a symbol.
    Synthetic(SyntheticArgs),
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ComputeArgs {
    /// Path to a document shaped like the options API response.
    #[arg(long)]
    pub file: PathBuf,

    /// Symbol to label the result with.
    #[arg(long, default_value = "UNKNOWN")]
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    pub text: String,

    /// Also resolve every ticker found.
    #[arg(long, default_value_t = false)]
    pub resolve: bool,
}

#[derive(Debug, Args)]
pub struct SyntheticArgs {
    pub symbol: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ComputeModeArg {
    Local,
    Remote,
}

impl From<ComputeModeArg> for ComputeMode {
    fn from(value: ComputeModeArg) -> Self {
        match value {
            ComputeModeArg::Local => Self::Local,
            ComputeModeArg::Remote => Self::Remote,
        }
    }
}
