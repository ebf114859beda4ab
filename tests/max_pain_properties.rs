//! Mathematical correctness tests for the max-pain calculator
//!
//! Chains are generated from a fixed-seed linear congruential generator so
//! every run checks the same inputs.

use strikepin_core::CalculationError;
use strikepin_tests::*;

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn generated_side(rng: &mut Lcg) -> Vec<OptionContract> {
    let count = 1 + rng.below(12);
    (0..count)
        .map(|_| {
            let strike = 50.0 + rng.below(40) as f64 * 2.5;
            OptionContract::new(strike, rng.below(5_000))
        })
        .collect()
}

fn generated_chain(rng: &mut Lcg) -> OptionsChain {
    let calls = generated_side(rng);
    let puts = generated_side(rng);
    let price = 50.0 + rng.below(10_000) as f64 / 100.0;
    OptionsChain::new(symbol("GEN"), price, calls, puts)
}

#[test]
fn when_chain_is_scenario_max_pain_matches_hand_calculation() {
    // Given: The reference chain at price 150.50
    let chain = OptionsChain::new(
        symbol("AAPL"),
        150.50,
        vec![
            OptionContract::new(145.0, 1000),
            OptionContract::new(150.0, 2000),
            OptionContract::new(155.0, 1500),
        ],
        vec![
            OptionContract::new(145.0, 1200),
            OptionContract::new(150.0, 1800),
            OptionContract::new(155.0, 800),
        ],
    );

    // When: Max pain is computed
    let estimate = calculator::compute(&chain).expect("scenario should compute");

    // Then: Pain per strike and the winner match the worked example
    assert_eq!(calculator::pain_at(&chain, 145.0), 17_000.0);
    assert_eq!(calculator::pain_at(&chain, 150.0), 9_000.0);
    assert_eq!(calculator::pain_at(&chain, 155.0), 20_000.0);
    assert_eq!(estimate.max_pain, 150.0);
}

#[test]
fn when_chains_are_generated_max_pain_is_a_listed_strike_with_minimal_pain() {
    let mut rng = Lcg(0x5EED);

    for _ in 0..200 {
        // Given: A generated chain
        let chain = generated_chain(&mut rng);

        // When: Max pain is computed
        let estimate = calculator::compute(&chain).expect("generated chains are valid");

        // Then: It is one of the strikes and no strike has less pain
        let strikes = calculator::candidate_strikes(&chain);
        assert!(strikes.contains(&estimate.max_pain));
        let best = calculator::pain_at(&chain, estimate.max_pain);
        for &strike in &strikes {
            let pain = calculator::pain_at(&chain, strike);
            assert!(best <= pain, "strike {strike} has pain {pain} < {best}");
            if pain == best {
                assert!(estimate.max_pain <= strike, "tie must resolve to the lowest strike");
            }
        }
        assert_eq!(estimate.strikes_analyzed, strikes.len());
    }
}

#[test]
fn when_computation_repeats_result_is_identical() {
    let mut rng = Lcg(42);
    let chain = generated_chain(&mut rng);

    let first = calculator::compute(&chain).expect("valid chain");
    let second = calculator::compute(&chain).expect("valid chain");

    assert_eq!(first.max_pain, second.max_pain);
    assert_eq!(first.sentiment, second.sentiment);
    assert_eq!(first.percentage_diff, second.percentage_diff);
}

#[test]
fn when_either_side_is_empty_computation_reports_insufficient_data() {
    let only_calls = OptionsChain::new(
        symbol("X"),
        10.0,
        vec![OptionContract::new(10.0, 5)],
        Vec::new(),
    );

    assert!(matches!(
        calculator::compute(&only_calls),
        Err(CalculationError::InsufficientData { calls: 1, puts: 0 })
    ));
}

#[test]
fn when_price_sits_on_band_edges_sentiment_uses_inclusive_lower_band() {
    let cases = [
        (100.0, 95.0, Sentiment::Neutral),
        (100.0, 90.0, Sentiment::SlightlyBearish),
        (100.0, 89.9, Sentiment::Bearish),
        (100.0, 105.0, Sentiment::Neutral),
        (100.0, 110.0, Sentiment::SlightlyBullish),
        (100.0, 110.1, Sentiment::Bullish),
        (100.0, 100.0, Sentiment::Neutral),
    ];

    for (price, max_pain, expected) in cases {
        assert_eq!(
            calculator::classify_sentiment(price, max_pain),
            expected,
            "price {price} vs max pain {max_pain}"
        );
    }
}

#[test]
fn when_symbol_is_unknown_synthetic_estimate_uses_default_range() {
    let estimate = synthetic::estimate(&symbol("QQQX"));

    assert!((50.0..=200.0).contains(&estimate.underlying_price));
    assert_eq!(estimate.strikes_analyzed, 0);
    let ratio = estimate.max_pain / estimate.underlying_price;
    assert!((0.949..=1.051).contains(&ratio), "ratio {ratio}");
}
