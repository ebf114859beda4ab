use serde_json::json;
use strikepin_core::{extract_tickers, Orchestrator, PipelineConfig, Symbol};

use crate::cli::ScanArgs;
use crate::error::CliError;

use super::{collect_resolutions, CommandResult};

pub async fn run(args: &ScanArgs, config: PipelineConfig) -> Result<CommandResult, CliError> {
    let tickers = extract_tickers(&args.text);
    let names = tickers.iter().map(Symbol::as_str).collect::<Vec<_>>();

    if !args.resolve || tickers.is_empty() {
        let result = CommandResult::ok(json!({ "tickers": names }));
        return Ok(if tickers.is_empty() {
            result.with_warning("no cashtags found")
        } else {
            result
        });
    }

    let orchestrator = Orchestrator::from_config(config);
    let mut result = collect_resolutions(orchestrator.resolve_many_traced(&tickers).await)?;
    if let Some(data) = result.data.as_object_mut() {
        data.insert(String::from("tickers"), json!(names));
    }
    Ok(result)
}
