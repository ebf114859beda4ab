use strikepin_core::{Orchestrator, PipelineConfig};

use crate::cli::ResolveArgs;
use crate::error::CliError;

use super::{collect_resolutions, parse_symbols, CommandResult};

pub async fn run(args: &ResolveArgs, config: PipelineConfig) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let orchestrator = Orchestrator::from_config(config);

    collect_resolutions(orchestrator.resolve_many_traced(&symbols).await)
}
