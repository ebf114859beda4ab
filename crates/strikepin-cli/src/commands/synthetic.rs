use strikepin_core::{synthetic, ResultSource, Symbol};

use crate::cli::SyntheticArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &SyntheticArgs) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let result = synthetic::estimate(&symbol).into_result(ResultSource::Synthetic);

    Ok(CommandResult::ok(serde_json::to_value(&result)?)
        .with_warning("synthetic estimate; not derived from market data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_output_is_tagged() {
        let args = SyntheticArgs {
            symbol: String::from("nflx"),
        };

        let result = run(&args).expect("synthetic never fails for a valid symbol");

        assert_eq!(result.data["symbol"], "NFLX");
        assert_eq!(result.data["source"], "synthetic");
        let price = result.data["underlyingPrice"]
            .as_f64()
            .expect("price should be numeric");
        assert!((500.0..=700.0).contains(&price));
    }
}
