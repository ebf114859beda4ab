mod compute;
mod resolve;
mod scan;
mod synthetic;

use std::time::Duration;

use serde_json::Value;
use strikepin_core::{PipelineConfig, Resolution, ResolveError, Symbol};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Resolve(args) => resolve::run(args, pipeline_config(cli)?).await,
        Command::Compute(args) => compute::run(args),
        Command::Scan(args) => scan::run(args, pipeline_config(cli)?).await,
        Command::Synthetic(args) => synthetic::run(args),
    }
}

/// Environment configuration with command-line flags applied on top.
fn pipeline_config(cli: &Cli) -> Result<PipelineConfig, CliError> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_overall_timeout(Duration::from_millis(timeout_ms));
    }
    if let Some(url) = &cli.remote_url {
        config = config.with_remote_url(url.clone());
    }
    if let Some(mode) = cli.compute_mode {
        config = config.with_compute_mode(mode.into());
    }
    Ok(config)
}

fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter()
        .map(|value| Symbol::parse(value).map_err(CliError::from))
        .collect()
}

/// Folds traced resolutions into one command result, keeping input order.
///
/// Fails outright only when every symbol was rate limited.
fn collect_resolutions(
    outcomes: Vec<Result<Resolution, ResolveError>>,
) -> Result<CommandResult, CliError> {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let mut latency_ms = 0;

    for outcome in outcomes {
        match outcome {
            Ok(resolution) => {
                latency_ms = latency_ms.max(resolution.latency_ms);
                let symbol = resolution.result.symbol.clone();
                warnings.extend(
                    resolution
                        .warnings
                        .into_iter()
                        .map(|warning| format!("{symbol}: {warning}")),
                );
                results.push(serde_json::to_value(&resolution.result)?);
            }
            Err(error) => errors.push(error),
        }
    }

    if results.is_empty() {
        if let Some(error) = errors.first() {
            return Err(error.clone().into());
        }
    }

    Ok(CommandResult::ok(serde_json::json!({ "results": results }))
        .with_warnings(warnings)
        .with_errors(errors.iter().map(ToString::to_string).collect())
        .with_latency(latency_ms))
}
