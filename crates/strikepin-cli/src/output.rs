use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct Report<'a> {
    data: &'a Value,
    meta: ReportMeta<'a>,
}

#[derive(Debug, Serialize)]
struct ReportMeta<'a> {
    warnings: &'a [String],
    errors: &'a [String],
    latency_ms: u64,
}

pub fn to_json(result: &CommandResult, pretty: bool) -> Result<String, CliError> {
    let report = Report {
        data: &result.data,
        meta: ReportMeta {
            warnings: &result.warnings,
            errors: &result.errors,
            latency_ms: result.latency_ms,
        },
    };

    let payload = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(payload)
}

pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    println!("{}", to_json(result, pretty)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_wraps_data_with_meta() {
        let result = CommandResult::ok(json!({"tickers": ["AAPL"]}))
            .with_warning("synthetic result")
            .with_latency(12);

        let rendered: Value =
            serde_json::from_str(&to_json(&result, false).expect("should render"))
                .expect("output should be JSON");

        assert_eq!(rendered["data"]["tickers"][0], "AAPL");
        assert_eq!(rendered["meta"]["warnings"][0], "synthetic result");
        assert_eq!(rendered["meta"]["errors"], json!([]));
        assert_eq!(rendered["meta"]["latency_ms"], 12);
    }
}
