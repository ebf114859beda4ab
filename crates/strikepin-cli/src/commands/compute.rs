use std::fs;

use strikepin_core::{calculator, parse_options_response, ResultSource, Symbol};

use crate::cli::ComputeArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &ComputeArgs) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let body = fs::read_to_string(&args.file)?;
    let fetched = parse_options_response(&symbol, &body)?;
    let estimate = calculator::compute(&fetched.chain)?;

    Ok(CommandResult::ok(serde_json::to_value(
        estimate.into_result(ResultSource::Live),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CHAIN: &str = r#"{"optionChain":{"result":[{
        "quote":{"regularMarketPrice":150.5},
        "options":[{
            "calls":[{"strike":145,"openInterest":1000},{"strike":150,"openInterest":2000},{"strike":155,"openInterest":1500}],
            "puts":[{"strike":145,"openInterest":1200},{"strike":150,"openInterest":1800},{"strike":155,"openInterest":800}]
        }]
    }]}}"#;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(contents.as_bytes())
            .expect("temp file should be writable");
        file
    }

    #[test]
    fn computes_from_saved_document() {
        let file = write_temp(CHAIN);
        let args = ComputeArgs {
            file: file.path().to_path_buf(),
            symbol: String::from("aapl"),
        };

        let result = run(&args).expect("compute should succeed");

        assert_eq!(result.data["symbol"], "AAPL");
        assert_eq!(result.data["maxPain"], 150.0);
        assert_eq!(result.data["strikesAnalyzed"], 3);
    }

    #[test]
    fn one_sided_chain_is_an_input_error() {
        let file = write_temp(
            r#"{"optionChain":{"result":[{"quote":{"regularMarketPrice":10},"options":[{"calls":[{"strike":10}],"puts":[]}]}]}}"#,
        );
        let args = ComputeArgs {
            file: file.path().to_path_buf(),
            symbol: String::from("XYZ"),
        };

        let error = run(&args).expect_err("no puts must fail");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let args = ComputeArgs {
            file: "/nonexistent/strikepin/chain.json".into(),
            symbol: String::from("AAPL"),
        };

        let error = run(&args).expect_err("missing file must fail");
        assert_eq!(error.exit_code(), 10);
    }
}
