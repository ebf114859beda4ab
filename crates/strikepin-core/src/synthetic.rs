//! Last-resort estimate used when neither live data nor a cached result exists.
//!
//! Values are derived from the symbol alone, so the same ticker always gets
//! the same numbers. They are placeholders and carry the `synthetic` tag.

use crate::calculator::{classify_sentiment, insight_for, percentage_diff, round_to};
use crate::{MaxPainEstimate, Symbol, UtcDateTime};

/// Plausible trading range for a ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

const fn range(min: f64, max: f64) -> PriceRange {
    PriceRange { min, max }
}

const KNOWN_RANGES: [(&str, PriceRange); 8] = [
    ("AAPL", range(170.0, 220.0)),
    ("TSLA", range(180.0, 250.0)),
    ("META", range(300.0, 400.0)),
    ("GOOGL", range(130.0, 160.0)),
    ("MSFT", range(350.0, 450.0)),
    ("AMZN", range(150.0, 200.0)),
    ("NVDA", range(400.0, 600.0)),
    ("NFLX", range(500.0, 700.0)),
];

pub const DEFAULT_RANGE: PriceRange = range(50.0, 200.0);

/// Max pain lands between 95% and 105% of the synthetic price.
const MAX_PAIN_FACTOR_MIN: f64 = 0.95;
const MAX_PAIN_FACTOR_SPAN: f64 = 0.10;

pub fn price_range(symbol: &Symbol) -> PriceRange {
    KNOWN_RANGES
        .iter()
        .find(|(ticker, _)| *ticker == symbol.as_str())
        .map(|(_, range)| *range)
        .unwrap_or(DEFAULT_RANGE)
}

pub fn estimate(symbol: &Symbol) -> MaxPainEstimate {
    let seed = symbol_seed(symbol);
    let range = price_range(symbol);

    let price = round_to(range.min + unit(seed, 0) * (range.max - range.min), 2);
    let factor = MAX_PAIN_FACTOR_MIN + unit(seed, 1) * MAX_PAIN_FACTOR_SPAN;
    let max_pain = round_to(price * factor, 2);

    let sentiment = classify_sentiment(price, max_pain);
    MaxPainEstimate {
        symbol: symbol.clone(),
        max_pain,
        underlying_price: price,
        percentage_diff: round_to(percentage_diff(price, max_pain), 2),
        sentiment,
        insight: insight_for(sentiment, price, max_pain),
        strikes_analyzed: 0,
        timestamp: UtcDateTime::now(),
    }
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol
        .as_str()
        .bytes()
        .fold(0_u64, |acc, byte| acc.wrapping_mul(33).wrapping_add(byte as u64))
}

/// Deterministic value in `[0, 1)` for the given seed and draw index.
fn unit(seed: u64, draw: u64) -> f64 {
    let mut z = seed
        .wrapping_add(draw.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1_u64 << 53) as f64
}
