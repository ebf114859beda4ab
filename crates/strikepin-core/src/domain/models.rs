use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime};

/// One strike of an options chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub strike: f64,
    /// Outstanding contracts; upstream omits the field when it is zero.
    #[serde(default)]
    pub open_interest: u64,
}

impl OptionContract {
    pub const fn new(strike: f64, open_interest: u64) -> Self {
        Self {
            strike,
            open_interest,
        }
    }
}

/// Nearest-expiration options chain for one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsChain {
    pub symbol: Symbol,
    pub underlying_price: f64,
    /// Expiration of this chain in unix seconds, when upstream reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionsChain {
    pub fn new(
        symbol: Symbol,
        underlying_price: f64,
        calls: Vec<OptionContract>,
        puts: Vec<OptionContract>,
    ) -> Self {
        Self {
            symbol,
            underlying_price,
            expiration: None,
            calls,
            puts,
        }
    }

    pub fn with_expiration(mut self, expiration: i64) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn contract_count(&self) -> usize {
        self.calls.len() + self.puts.len()
    }
}

/// Where the price sits relative to max pain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Bearish,
    SlightlyBearish,
    Neutral,
    SlightlyBullish,
    Bullish,
}

impl Sentiment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bearish => "bearish",
            Self::SlightlyBearish => "slightly_bearish",
            Self::Neutral => "neutral",
            Self::SlightlyBullish => "slightly_bullish",
            Self::Bullish => "bullish",
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tier of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Live,
    Cache,
    Synthetic,
}

impl ResultSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cache => "cache",
            Self::Synthetic => "synthetic",
        }
    }
}

impl Display for ResultSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the calculator, not yet attributed to a pipeline tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxPainEstimate {
    pub symbol: Symbol,
    pub max_pain: f64,
    pub underlying_price: f64,
    pub percentage_diff: f64,
    pub sentiment: Sentiment,
    pub insight: String,
    pub strikes_analyzed: usize,
    pub timestamp: UtcDateTime,
}

impl MaxPainEstimate {
    pub fn into_result(self, source: ResultSource) -> MaxPainResult {
        MaxPainResult {
            symbol: self.symbol,
            max_pain: self.max_pain,
            underlying_price: self.underlying_price,
            percentage_diff: self.percentage_diff,
            sentiment: self.sentiment,
            insight: self.insight,
            strikes_analyzed: self.strikes_analyzed,
            timestamp: self.timestamp,
            source,
        }
    }
}

/// Result handed to callers, always labeled with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxPainResult {
    pub symbol: Symbol,
    pub max_pain: f64,
    pub underlying_price: f64,
    pub percentage_diff: f64,
    pub sentiment: Sentiment,
    pub insight: String,
    #[serde(default)]
    pub strikes_analyzed: usize,
    pub timestamp: UtcDateTime,
    pub source: ResultSource,
}

impl MaxPainResult {
    /// Copy of this result attributed to another tier.
    pub fn with_source(&self, source: ResultSource) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    pub const fn is_live(&self) -> bool {
        matches!(self.source, ResultSource::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_interest_defaults_to_zero_when_absent() {
        let contract: OptionContract =
            serde_json::from_str(r#"{"strike": 150.0}"#).expect("contract should parse");
        assert_eq!(contract, OptionContract::new(150.0, 0));
    }

    #[test]
    fn result_serializes_with_camel_case_fields_and_snake_case_enums() {
        let result = MaxPainEstimate {
            symbol: Symbol::parse("AAPL").expect("valid symbol"),
            max_pain: 150.0,
            underlying_price: 165.0,
            percentage_diff: 9.09,
            sentiment: Sentiment::SlightlyBearish,
            insight: String::from("test"),
            strikes_analyzed: 3,
            timestamp: UtcDateTime::parse("2025-01-01T00:00:00Z").expect("valid timestamp"),
        }
        .into_result(ResultSource::Live);

        let json = serde_json::to_value(&result).expect("result should serialize");
        assert_eq!(json["maxPain"], 150.0);
        assert_eq!(json["underlyingPrice"], 165.0);
        assert_eq!(json["sentiment"], "slightly_bearish");
        assert_eq!(json["source"], "live");
        assert_eq!(json["timestamp"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn retagging_leaves_original_untouched() {
        let original = MaxPainEstimate {
            symbol: Symbol::parse("MSFT").expect("valid symbol"),
            max_pain: 400.0,
            underlying_price: 400.0,
            percentage_diff: 0.0,
            sentiment: Sentiment::Neutral,
            insight: String::new(),
            strikes_analyzed: 12,
            timestamp: UtcDateTime::now(),
        }
        .into_result(ResultSource::Live);

        let cached = original.with_source(ResultSource::Cache);
        assert_eq!(original.source, ResultSource::Live);
        assert_eq!(cached.source, ResultSource::Cache);
        assert_eq!(cached.max_pain, original.max_pain);
        assert!(!cached.is_live());
    }
}
