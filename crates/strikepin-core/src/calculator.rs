//! Max-pain computation over a single options chain.
//!
//! Everything here is pure: no I/O and no clocks beyond stamping the
//! estimate with the current time.

use crate::{
    CalculationError, MaxPainEstimate, OptionContract, OptionsChain, Sentiment, UtcDateTime,
};

const NEUTRAL_BAND_PCT: f64 = 5.0;
const STRONG_BAND_PCT: f64 = 10.0;

/// Computes the max-pain strike for `chain` and classifies the current price against it.
pub fn compute(chain: &OptionsChain) -> Result<MaxPainEstimate, CalculationError> {
    validate(chain)?;

    let strikes = candidate_strikes(chain);
    let mut best: Option<(f64, f64)> = None;
    for &strike in &strikes {
        let pain = pain_at(chain, strike);
        // strictly lower only, so equal pain keeps the lower strike
        if best.is_none_or(|(_, lowest)| pain < lowest) {
            best = Some((strike, pain));
        }
    }

    let Some((max_pain, _)) = best else {
        return Err(CalculationError::InsufficientData {
            calls: chain.calls.len(),
            puts: chain.puts.len(),
        });
    };

    let price = chain.underlying_price;
    let sentiment = classify_sentiment(price, max_pain);
    let diff = percentage_diff(price, max_pain);

    Ok(MaxPainEstimate {
        symbol: chain.symbol.clone(),
        max_pain,
        underlying_price: price,
        percentage_diff: round_to(diff, 2),
        sentiment,
        insight: insight_for(sentiment, price, max_pain),
        strikes_analyzed: strikes.len(),
        timestamp: UtcDateTime::now(),
    })
}

fn validate(chain: &OptionsChain) -> Result<(), CalculationError> {
    if chain.calls.is_empty() || chain.puts.is_empty() {
        return Err(CalculationError::InsufficientData {
            calls: chain.calls.len(),
            puts: chain.puts.len(),
        });
    }
    if !chain.underlying_price.is_finite() || chain.underlying_price <= 0.0 {
        return Err(CalculationError::InvalidChain {
            reason: "underlying price must be positive and finite",
        });
    }
    let all_finite = chain
        .calls
        .iter()
        .chain(&chain.puts)
        .all(|contract| contract.strike.is_finite());
    if !all_finite {
        return Err(CalculationError::InvalidChain {
            reason: "strikes must be finite",
        });
    }
    Ok(())
}

/// Sorted, de-duplicated strikes across calls and puts.
pub fn candidate_strikes(chain: &OptionsChain) -> Vec<f64> {
    let mut strikes = chain
        .calls
        .iter()
        .chain(&chain.puts)
        .map(|contract| contract.strike)
        .collect::<Vec<_>>();
    strikes.sort_by(f64::total_cmp);
    strikes.dedup();
    strikes
}

/// Aggregate payout to option holders if the underlying settles at `settle`.
pub fn pain_at(chain: &OptionsChain, settle: f64) -> f64 {
    let calls = chain
        .calls
        .iter()
        .map(|c| intrinsic(settle - c.strike, c))
        .sum::<f64>();
    let puts = chain
        .puts
        .iter()
        .map(|p| intrinsic(p.strike - settle, p))
        .sum::<f64>();
    calls + puts
}

fn intrinsic(moneyness: f64, contract: &OptionContract) -> f64 {
    moneyness.max(0.0) * contract.open_interest as f64
}

/// Absolute distance between price and max pain, as a percentage of price.
pub fn percentage_diff(price: f64, max_pain: f64) -> f64 {
    (price - max_pain).abs() * 100.0 / price
}

pub fn classify_sentiment(price: f64, max_pain: f64) -> Sentiment {
    if price == max_pain {
        return Sentiment::Neutral;
    }

    let diff = percentage_diff(price, max_pain);
    let above = price > max_pain;
    if diff > STRONG_BAND_PCT {
        if above {
            Sentiment::Bearish
        } else {
            Sentiment::Bullish
        }
    } else if diff > NEUTRAL_BAND_PCT {
        if above {
            Sentiment::SlightlyBearish
        } else {
            Sentiment::SlightlyBullish
        }
    } else {
        Sentiment::Neutral
    }
}

/// Short human-readable reading of a sentiment.
pub fn insight_for(sentiment: Sentiment, price: f64, max_pain: f64) -> String {
    let diff = percentage_diff(price, max_pain);
    match sentiment {
        Sentiment::Bearish => format!(
            "Price ${price:.2} is significantly above max pain ({diff:.1}%). Market makers have strong incentive to push price down toward ${max_pain:.2} by expiration."
        ),
        Sentiment::SlightlyBearish => format!(
            "Price ${price:.2} is moderately above max pain ({diff:.1}%). Some downward pressure expected toward ${max_pain:.2}."
        ),
        Sentiment::Bullish => format!(
            "Price ${price:.2} is significantly below max pain ({diff:.1}%). Market makers have incentive to push price up toward ${max_pain:.2} by expiration."
        ),
        Sentiment::SlightlyBullish => format!(
            "Price ${price:.2} is moderately below max pain ({diff:.1}%). Some upward pressure expected toward ${max_pain:.2}."
        ),
        Sentiment::Neutral if price == max_pain => format!(
            "Price is exactly at max pain (${max_pain:.2}). Maximum pain for option holders at the current level."
        ),
        Sentiment::Neutral => format!(
            "Price ${price:.2} is near max pain ${max_pain:.2}. Low volatility expected as price is pinned around current levels."
        ),
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
