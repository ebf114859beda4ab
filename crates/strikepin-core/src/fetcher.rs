//! Options chain retrieval from the upstream JSON API.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http_client::{HttpClient, HttpRequest};
use crate::token::Token;
use crate::{FetchError, OptionContract, OptionsChain, Symbol};

const API_HEADERS: [(&str, &str); 4] = [
    ("accept", "application/json"),
    ("accept-language", "en-US,en;q=0.9"),
    ("referer", "https://finance.yahoo.com/"),
    ("origin", "https://finance.yahoo.com"),
];

/// Parsed chain together with the upstream document it came from.
///
/// The raw document is what the remote computation sink expects as `rawData`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedOptions {
    pub chain: OptionsChain,
    pub raw: Value,
}

/// Capability that fetches the nearest-expiration chain for a symbol.
pub trait OptionsFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        symbol: &'a Symbol,
        token: &'a Token,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedOptions, FetchError>> + Send + 'a>>;
}

/// Fetcher for the `v7/finance/options` endpoint, authenticated by crumb.
#[derive(Clone)]
pub struct YahooOptionsFetcher {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl YahooOptionsFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn endpoint(&self, symbol: &Symbol, token: &Token) -> String {
        format!(
            "{}/v7/finance/options/{}?formatted=false&lang=en-US&region=US&crumb={}",
            self.base_url,
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(token.value())
        )
    }
}

impl OptionsFetcher for YahooOptionsFetcher {
    fn fetch<'a>(
        &'a self,
        symbol: &'a Symbol,
        token: &'a Token,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedOptions, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.endpoint(symbol, token))
                .with_headers(API_HEADERS)
                .with_timeout_ms(self.timeout_ms);

            let response = self.http_client.execute(request).await.map_err(|error| {
                FetchError::upstream(format!("options transport error: {}", error.message()))
            })?;

            if !response.is_success() {
                debug!(%symbol, status = response.status, "options request rejected");
                return Err(FetchError::from_status(response.status));
            }

            parse_options_response(symbol, &response.body)
        })
    }
}

/// Parses an upstream options document into the nearest-expiration chain.
///
/// Contracts without a strike are skipped; missing open interest counts as zero.
pub fn parse_options_response(symbol: &Symbol, body: &str) -> Result<FetchedOptions, FetchError> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::malformed(format!("options body is not JSON: {e}")))?;
    let chain = chain_from_document(symbol, &raw)?;
    Ok(FetchedOptions { chain, raw })
}

/// Extracts the nearest-expiration chain from an already-parsed document.
pub fn chain_from_document(symbol: &Symbol, raw: &Value) -> Result<OptionsChain, FetchError> {
    let response = OptionsResponse::deserialize(raw)
        .map_err(|e| FetchError::malformed(format!("unexpected options structure: {e}")))?;

    let result = response
        .option_chain
        .result
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::malformed("options response has no result entries"))?;

    let price = result
        .quote
        .regular_market_price
        .filter(|price| price.is_finite())
        .ok_or_else(|| FetchError::malformed("options response has no regularMarketPrice"))?;

    let nearest = result
        .options
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::malformed("options response has no expirations"))?;

    let mut chain = OptionsChain::new(
        symbol.clone(),
        price,
        normalize_contracts(nearest.calls),
        normalize_contracts(nearest.puts),
    );
    if let Some(expiration) = nearest.expiration_date {
        chain = chain.with_expiration(expiration);
    }
    Ok(chain)
}

fn normalize_contracts(contracts: Vec<RawContract>) -> Vec<OptionContract> {
    contracts
        .into_iter()
        .filter_map(|contract| {
            let strike = contract.strike.filter(|strike| strike.is_finite())?;
            let open_interest = contract
                .open_interest
                .filter(|oi| oi.is_finite() && *oi > 0.0)
                .map(|oi| oi.round() as u64)
                .unwrap_or(0);
            Some(OptionContract::new(strike, open_interest))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionChainEnvelope,
}

#[derive(Debug, Deserialize)]
struct OptionChainEnvelope {
    #[serde(default)]
    result: Vec<OptionChainResult>,
}

#[derive(Debug, Deserialize)]
struct OptionChainResult {
    quote: RawQuote,
    #[serde(default)]
    options: Vec<RawExpiration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExpiration {
    #[serde(default)]
    expiration_date: Option<i64>,
    #[serde(default)]
    calls: Vec<RawContract>,
    #[serde(default)]
    puts: Vec<RawContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContract {
    #[serde(default)]
    strike: Option<f64>,
    #[serde(default)]
    open_interest: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::FetchErrorKind;
    use std::sync::Mutex;

    const CHAIN_JSON: &str = r#"{
        "optionChain": {
            "result": [{
                "quote": {"regularMarketPrice": 150.5},
                "options": [{
                    "expirationDate": 1743379200,
                    "calls": [
                        {"strike": 145, "openInterest": 1000},
                        {"strike": 150, "openInterest": 2000},
                        {"strike": 155}
                    ],
                    "puts": [
                        {"strike": 145, "openInterest": 1200},
                        {"openInterest": 50}
                    ]
                }, {
                    "expirationDate": 1743984000,
                    "calls": [{"strike": 999, "openInterest": 1}],
                    "puts": []
                }]
            }],
            "error": null
        }
    }"#;

    struct FixedResponse {
        response: Result<HttpResponse, HttpError>,
        urls: Mutex<Vec<String>>,
    }

    impl FixedResponse {
        fn new(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                response,
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for FixedResponse {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.urls
                .lock()
                .expect("url log should not be poisoned")
                .push(request.url);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").expect("valid symbol")
    }

    #[test]
    fn parses_nearest_expiration_only() {
        let fetched = parse_options_response(&aapl(), CHAIN_JSON).expect("chain should parse");

        assert_eq!(fetched.chain.underlying_price, 150.5);
        assert_eq!(fetched.chain.expiration, Some(1743379200));
        assert_eq!(
            fetched.chain.calls,
            vec![
                OptionContract::new(145.0, 1000),
                OptionContract::new(150.0, 2000),
                OptionContract::new(155.0, 0),
            ]
        );
        assert_eq!(fetched.chain.puts, vec![OptionContract::new(145.0, 1200)]);
        assert!(fetched.raw["optionChain"]["result"].is_array());
    }

    #[test]
    fn empty_result_is_malformed() {
        let error = parse_options_response(&aapl(), r#"{"optionChain":{"result":[]}}"#)
            .expect_err("must fail");
        assert_eq!(error.kind(), FetchErrorKind::Malformed);
    }

    #[test]
    fn html_body_is_malformed() {
        let error = parse_options_response(&aapl(), "<html>Will be right back</html>")
            .expect_err("must fail");
        assert_eq!(error.kind(), FetchErrorKind::Malformed);
    }

    #[test]
    fn missing_price_is_malformed() {
        let body =
            r#"{"optionChain":{"result":[{"quote":{},"options":[{"calls":[],"puts":[]}]}]}}"#;
        let error = parse_options_response(&aapl(), body).expect_err("must fail");
        assert_eq!(error.kind(), FetchErrorKind::Malformed);
    }

    #[tokio::test]
    async fn embeds_crumb_in_query_string() {
        let client = Arc::new(FixedResponse::new(Ok(HttpResponse::ok(CHAIN_JSON))));
        let fetcher = YahooOptionsFetcher::new(client.clone(), "https://query.example/");

        fetcher
            .fetch(&aapl(), &Token::new("a/b c"))
            .await
            .expect("fetch should succeed");

        let urls = client.urls.lock().expect("url log should not be poisoned");
        assert_eq!(
            urls[0],
            "https://query.example/v7/finance/options/AAPL?formatted=false&lang=en-US&region=US&crumb=a%2Fb%20c"
        );
    }

    #[tokio::test]
    async fn classifies_http_statuses() {
        for (status, kind) in [
            (401, FetchErrorKind::Unauthorized),
            (403, FetchErrorKind::Unauthorized),
            (429, FetchErrorKind::RateLimited),
            (502, FetchErrorKind::Upstream),
        ] {
            let client = Arc::new(FixedResponse::new(Ok(HttpResponse::new(status, ""))));
            let fetcher = YahooOptionsFetcher::new(client, "https://query.example");

            let error = fetcher
                .fetch(&aapl(), &Token::new("crumb"))
                .await
                .expect_err("non-2xx must fail");
            assert_eq!(error.kind(), kind, "status {status}");
        }
    }

    #[tokio::test]
    async fn transport_failure_is_upstream() {
        let client = Arc::new(FixedResponse::new(Err(HttpError::new("connection reset"))));
        let fetcher = YahooOptionsFetcher::new(client, "https://query.example");

        let error = fetcher
            .fetch(&aapl(), &Token::new("crumb"))
            .await
            .expect_err("transport error must fail");
        assert_eq!(error.kind(), FetchErrorKind::Upstream);
    }
}
