//! Client for the remote computation worker.
//!
//! The worker exposes two endpoints:
//!
//! - `POST /api/analyze` computes max pain from a raw upstream options document
//!   and caches the result on its side.
//! - `GET /api/max-pain/{SYMBOL}` returns the worker's cached result, or 404
//!   when it has none.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::calculator::{classify_sentiment, insight_for, percentage_diff, round_to};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::{FetchError, MaxPainResult, ResultSource, Symbol, UtcDateTime};

#[derive(Clone)]
pub struct RemotePeer {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    symbol: &'a str,
    raw_data: &'a Value,
    timestamp: String,
}

/// Response body shared by both endpoints.
///
/// `percentageDiff` arrives as a signed string and is recomputed locally.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAnalysis {
    symbol: Option<String>,
    price: f64,
    max_pain: f64,
    #[serde(default)]
    insight: Option<String>,
    #[serde(default)]
    strikes_analyzed: usize,
    #[serde(default)]
    timestamp: Option<String>,
}

impl RemotePeer {
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

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the raw options document for remote computation.
    pub async fn analyze(&self, symbol: &Symbol, raw: &Value) -> Result<MaxPainResult, FetchError> {
        let body = serde_json::to_string(&AnalyzeRequest {
            symbol: symbol.as_str(),
            raw_data: raw,
            timestamp: UtcDateTime::now().format_rfc3339(),
        })
        .map_err(|e| FetchError::malformed(format!("failed to encode analyze request: {e}")))?;

        let request = HttpRequest::post(format!("{}/api/analyze", self.base_url))
            .with_json_body(body)
            .with_timeout_ms(self.timeout_ms);
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(FetchError::upstream(format!(
                "analyze endpoint returned status {}",
                response.status
            )));
        }

        parse_analysis(symbol, &response.body, ResultSource::Live)
    }

    /// Reads the worker's cached result; `Ok(None)` when it has none.
    pub async fn cached(&self, symbol: &Symbol) -> Result<Option<MaxPainResult>, FetchError> {
        let url = format!(
            "{}/api/max-pain/{}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);
        let response = self.send(request).await?;

        match response.status {
            404 => {
                debug!(%symbol, "remote cache has no entry");
                Ok(None)
            }
            status if (200..300).contains(&status) => {
                parse_analysis(symbol, &response.body, ResultSource::Cache).map(Some)
            }
            status => Err(FetchError::upstream(format!(
                "remote cache endpoint returned status {status}"
            ))),
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.http_client
            .execute(request)
            .await
            .map_err(|e| FetchError::upstream(format!("remote peer unreachable: {}", e.message())))
    }
}

fn parse_analysis(
    symbol: &Symbol,
    body: &str,
    source: ResultSource,
) -> Result<MaxPainResult, FetchError> {
    let analysis: RemoteAnalysis = serde_json::from_str(body)
        .map_err(|e| FetchError::malformed(format!("unexpected remote response: {e}")))?;

    if !analysis.price.is_finite() || analysis.price <= 0.0 || !analysis.max_pain.is_finite() {
        return Err(FetchError::malformed("remote response carries an unusable price"));
    }
    if let Some(reported) = analysis.symbol.as_deref() {
        if !reported.eq_ignore_ascii_case(symbol.as_str()) {
            return Err(FetchError::malformed(format!(
                "remote response is for '{reported}', expected '{symbol}'"
            )));
        }
    }

    let price = analysis.price;
    let max_pain = analysis.max_pain;
    let sentiment = classify_sentiment(price, max_pain);
    let insight = analysis
        .insight
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| insight_for(sentiment, price, max_pain));
    let timestamp = analysis
        .timestamp
        .as_deref()
        .and_then(|raw| UtcDateTime::parse(raw).ok())
        .unwrap_or_else(UtcDateTime::now);

    Ok(MaxPainResult {
        symbol: symbol.clone(),
        max_pain,
        underlying_price: price,
        percentage_diff: round_to(percentage_diff(price, max_pain), 2),
        sentiment,
        insight,
        strikes_analyzed: analysis.strikes_analyzed,
        timestamp,
        source,
    })
}
