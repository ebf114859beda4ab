//! Fallback chain that turns a symbol into a max-pain result.
//!
//! ```text
//! FreshToken -> Fetching -> Computing -> Done
//!     |            |  \          |
//!     |            |   TokenRetry (401/403, once)
//!     v            v             v
//!   CacheFallback (local cache, then remote cache) -> SyntheticFallback -> Done
//! ```
//!
//! Steps up to `Computing` run under one overall timeout. A 429 leaves the
//! chain entirely: the caller waits out the backoff and gets
//! [`ResolveError::RateLimited`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::calculator;
use crate::config::{ComputeMode, PipelineConfig};
use crate::fetcher::{FetchedOptions, OptionsFetcher, YahooOptionsFetcher};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::remote::RemotePeer;
use crate::synthetic;
use crate::token::{PageTokenAcquirer, TokenAcquirer, TokenSource, TokenStore};
use crate::{FetchErrorKind, MaxPainResult, ResolveError, ResultSource, Symbol};

/// States visited while resolving one symbol, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FreshToken,
    Fetching,
    Computing,
    TokenRetry,
    CacheFallback,
    SyntheticFallback,
    Done,
}

/// Successful resolution with the path that produced it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub result: MaxPainResult,
    pub stages: Vec<PipelineStage>,
    /// Why each fallback was taken, oldest first.
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

enum LiveOutcome {
    Resolved(MaxPainResult),
    RateLimited,
    Failed,
}

struct Trace {
    stages: Vec<PipelineStage>,
    warnings: Vec<String>,
}

impl Trace {
    fn enter(&mut self, symbol: &Symbol, stage: PipelineStage) {
        debug!(%symbol, ?stage, "pipeline transition");
        self.stages.push(stage);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Resolves symbols through live data, cache, and synthetic fallbacks.
///
/// Clones share the token store and result cache.
#[derive(Clone)]
pub struct Orchestrator {
    tokens: TokenStore,
    cache: ResultCache,
    acquirer: Arc<dyn TokenAcquirer>,
    fetcher: Arc<dyn OptionsFetcher>,
    remote: Option<RemotePeer>,
    token_sources: Vec<TokenSource>,
    compute_mode: ComputeMode,
    overall_timeout: Duration,
    remote_cache_timeout: Duration,
    rate_limit_wait: Duration,
}

impl Orchestrator {
    pub fn builder(config: PipelineConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Production wiring over a shared reqwest client.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub async fn resolve(&self, symbol: &Symbol) -> Result<MaxPainResult, ResolveError> {
        self.resolve_traced(symbol)
            .await
            .map(|resolution| resolution.result)
    }

    /// Resolves several symbols concurrently; results keep the input order.
    pub async fn resolve_many(
        &self,
        symbols: &[Symbol],
    ) -> Vec<Result<MaxPainResult, ResolveError>> {
        join_all(symbols.iter().map(|symbol| self.resolve(symbol))).await
    }

    pub async fn resolve_many_traced(
        &self,
        symbols: &[Symbol],
    ) -> Vec<Result<Resolution, ResolveError>> {
        join_all(symbols.iter().map(|symbol| self.resolve_traced(symbol))).await
    }

    pub async fn resolve_traced(&self, symbol: &Symbol) -> Result<Resolution, ResolveError> {
        let started = Instant::now();
        let mut trace = Trace {
            stages: Vec::new(),
            warnings: Vec::new(),
        };

        let attempt = self.live_attempt(symbol, &mut trace);
        let outcome = tokio::time::timeout(self.overall_timeout, attempt).await;
        let live = match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                let timeout_ms = self.overall_timeout.as_millis() as u64;
                warn!(%symbol, timeout_ms, "live resolution timed out");
                trace.warn(format!("live resolution exceeded {timeout_ms}ms"));
                LiveOutcome::Failed
            }
        };

        let result = match live {
            LiveOutcome::Resolved(result) => result,
            LiveOutcome::RateLimited => {
                warn!(
                    %symbol,
                    wait_ms = self.rate_limit_wait.as_millis() as u64,
                    "options source rate limited; backing off before reporting failure"
                );
                tokio::time::sleep(self.rate_limit_wait).await;
                return Err(ResolveError::RateLimited {
                    symbol: symbol.to_string(),
                    waited: self.rate_limit_wait,
                });
            }
            LiveOutcome::Failed => self.fallback(symbol, &mut trace).await,
        };

        trace.enter(symbol, PipelineStage::Done);
        info!(%symbol, source = %result.source, max_pain = result.max_pain, "resolved max pain");

        Ok(Resolution {
            result,
            stages: trace.stages,
            warnings: trace.warnings,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn live_attempt(&self, symbol: &Symbol, trace: &mut Trace) -> LiveOutcome {
        let mut retried = false;
        loop {
            trace.enter(
                symbol,
                if retried {
                    PipelineStage::TokenRetry
                } else {
                    PipelineStage::FreshToken
                },
            );

            let token = match self
                .tokens
                .get_or_acquire(self.acquirer.as_ref(), &self.token_sources)
                .await
            {
                Ok(token) => token,
                Err(error) => {
                    warn!(%symbol, %error, "crumb acquisition failed");
                    trace.warn(error.to_string());
                    return LiveOutcome::Failed;
                }
            };

            trace.enter(symbol, PipelineStage::Fetching);
            let fetched = match self.fetcher.fetch(symbol, &token).await {
                Ok(fetched) => fetched,
                Err(error) => match error.kind() {
                    FetchErrorKind::Unauthorized => {
                        self.tokens.invalidate_if_current(&token).await;
                        trace.warn(error.to_string());
                        if retried {
                            warn!(%symbol, %error, "crumb rejected after refresh");
                            return LiveOutcome::Failed;
                        }
                        debug!(
                            %symbol,
                            token = %token.redacted(),
                            "crumb rejected; acquiring a new one"
                        );
                        retried = true;
                        continue;
                    }
                    FetchErrorKind::RateLimited => {
                        trace.warn(error.to_string());
                        return LiveOutcome::RateLimited;
                    }
                    FetchErrorKind::Upstream | FetchErrorKind::Malformed => {
                        warn!(%symbol, %error, "options fetch failed");
                        trace.warn(error.to_string());
                        return LiveOutcome::Failed;
                    }
                },
            };

            trace.enter(symbol, PipelineStage::Computing);
            return match self.compute(symbol, &fetched).await {
                Ok(result) => {
                    self.cache.put(result.clone()).await;
                    LiveOutcome::Resolved(result)
                }
                Err(message) => {
                    warn!(%symbol, error = %message, "max-pain computation failed");
                    trace.warn(message);
                    LiveOutcome::Failed
                }
            };
        }
    }

    async fn compute(
        &self,
        symbol: &Symbol,
        fetched: &FetchedOptions,
    ) -> Result<MaxPainResult, String> {
        match (self.compute_mode, &self.remote) {
            (ComputeMode::Remote, Some(peer)) => peer
                .analyze(symbol, &fetched.raw)
                .await
                .map_err(|error| error.to_string()),
            _ => calculator::compute(&fetched.chain)
                .map(|estimate| estimate.into_result(ResultSource::Live))
                .map_err(|error| error.to_string()),
        }
    }

    async fn fallback(&self, symbol: &Symbol, trace: &mut Trace) -> MaxPainResult {
        trace.enter(symbol, PipelineStage::CacheFallback);
        if let Some(hit) = self.cache.get(symbol).await {
            warn!(%symbol, "live data unavailable; serving cached result");
            return hit.with_source(ResultSource::Cache);
        }

        if let Some(peer) = &self.remote {
            match tokio::time::timeout(self.remote_cache_timeout, peer.cached(symbol)).await {
                Ok(Ok(Some(hit))) => {
                    warn!(%symbol, "live data unavailable; serving remote cached result");
                    return hit.with_source(ResultSource::Cache);
                }
                Ok(Ok(None)) => debug!(%symbol, "remote cache miss"),
                Ok(Err(error)) => {
                    warn!(%symbol, %error, "remote cache lookup failed");
                    trace.warn(error.to_string());
                }
                Err(_) => {
                    let timeout_ms = self.remote_cache_timeout.as_millis() as u64;
                    warn!(%symbol, timeout_ms, "remote cache lookup timed out");
                    trace.warn(format!("remote cache lookup exceeded {timeout_ms}ms"));
                }
            }
        }

        trace.enter(symbol, PipelineStage::SyntheticFallback);
        warn!(%symbol, "no cached result; serving synthetic estimate");
        trace.warn(String::from("no live or cached data; result is synthetic"));
        synthetic::estimate(symbol).into_result(ResultSource::Synthetic)
    }
}

/// Wires an [`Orchestrator`] from configuration, with optional overrides for each collaborator.
pub struct OrchestratorBuilder {
    config: PipelineConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    acquirer: Option<Arc<dyn TokenAcquirer>>,
    fetcher: Option<Arc<dyn OptionsFetcher>>,
    remote: Option<RemotePeer>,
    tokens: Option<TokenStore>,
    cache: Option<ResultCache>,
}

impl OrchestratorBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            http_client: None,
            acquirer: None,
            fetcher: None,
            remote: None,
            tokens: None,
            cache: None,
        }
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_acquirer(mut self, acquirer: Arc<dyn TokenAcquirer>) -> Self {
        self.acquirer = Some(acquirer);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn OptionsFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_remote(mut self, remote: RemotePeer) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let timeout_ms = config.request_timeout_ms;
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));

        let acquirer = self.acquirer.unwrap_or_else(|| {
            Arc::new(
                PageTokenAcquirer::new(http_client.clone(), config.finance_base_url.clone())
                    .with_timeout_ms(timeout_ms),
            )
        });
        let fetcher = self.fetcher.unwrap_or_else(|| {
            Arc::new(
                YahooOptionsFetcher::new(http_client.clone(), config.query_base_url.clone())
                    .with_timeout_ms(timeout_ms),
            )
        });
        let remote = self.remote.or_else(|| {
            config.remote_url.as_ref().map(|url| {
                RemotePeer::new(http_client.clone(), url.clone()).with_timeout_ms(timeout_ms)
            })
        });

        if config.compute_mode == ComputeMode::Remote && remote.is_none() {
            warn!("remote compute mode requested without a remote URL; computing locally");
        }

        Orchestrator {
            tokens: self
                .tokens
                .unwrap_or_else(|| TokenStore::new(config.token_ttl)),
            cache: self
                .cache
                .unwrap_or_else(|| ResultCache::new(config.cache_ttl)),
            acquirer,
            fetcher,
            remote,
            token_sources: config.token_sources,
            compute_mode: config.compute_mode,
            overall_timeout: config.overall_timeout,
            remote_cache_timeout: Duration::from_millis(timeout_ms).min(config.overall_timeout),
            rate_limit_wait: config.rate_limit_wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpRequest, HttpResponse};
    use crate::token::Token;
    use crate::{AcquisitionError, FetchError, OptionContract, OptionsChain};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticAcquirer {
        calls: AtomicUsize,
    }

    impl StaticAcquirer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl TokenAcquirer for StaticAcquirer {
        fn acquire<'a>(
            &'a self,
            _source: &'a TokenSource,
        ) -> Pin<Box<dyn Future<Output = Result<Token, AcquisitionError>> + Send + 'a>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(Token::new(format!("crumb-{call}")))
            })
        }
    }

    enum Step {
        Chain,
        Fail(FetchError),
        Hang,
    }

    struct StepFetcher {
        steps: Mutex<Vec<Step>>,
        calls: AtomicUsize,
    }

    impl StepFetcher {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into_iter().rev().collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl OptionsFetcher for StepFetcher {
        fn fetch<'a>(
            &'a self,
            symbol: &'a Symbol,
            _token: &'a Token,
        ) -> Pin<Box<dyn Future<Output = Result<FetchedOptions, FetchError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .steps
                .lock()
                .expect("steps should not be poisoned")
                .pop()
                .unwrap_or_else(|| Step::Fail(FetchError::upstream("script exhausted")));
            Box::pin(async move {
                match step {
                    Step::Chain => Ok(FetchedOptions {
                        chain: OptionsChain::new(
                            symbol.clone(),
                            150.5,
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
                        ),
                        raw: serde_json::Value::Null,
                    }),
                    Step::Fail(error) => Err(error),
                    Step::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Err(FetchError::upstream("unreachable"))
                    }
                }
            })
        }
    }

    struct StalledWorker;

    impl HttpClient for StalledWorker {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(HttpResponse::new(404, "not found"))
            })
        }
    }

    fn orchestrator(acquirer: Arc<StaticAcquirer>, fetcher: Arc<StepFetcher>) -> Orchestrator {
        Orchestrator::builder(PipelineConfig::default())
            .with_acquirer(acquirer)
            .with_fetcher(fetcher)
            .build()
    }

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").expect("valid symbol")
    }

    #[tokio::test(start_paused = true)]
    async fn live_success_is_cached_and_tagged_live() {
        let fetcher = StepFetcher::new(vec![Step::Chain]);
        let orchestrator = orchestrator(StaticAcquirer::new(), fetcher);

        let resolution = orchestrator
            .resolve_traced(&aapl())
            .await
            .expect("live path should resolve");

        assert_eq!(resolution.result.source, ResultSource::Live);
        assert_eq!(resolution.result.max_pain, 150.0);
        assert_eq!(
            resolution.stages,
            vec![
                PipelineStage::FreshToken,
                PipelineStage::Fetching,
                PipelineStage::Computing,
                PipelineStage::Done,
            ]
        );
        assert!(orchestrator.cache().get(&aapl()).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_invalidates_and_retries_once() {
        let acquirer = StaticAcquirer::new();
        let fetcher = StepFetcher::new(vec![
            Step::Fail(FetchError::unauthorized("401")),
            Step::Chain,
        ]);
        let orchestrator = orchestrator(acquirer.clone(), fetcher.clone());

        let resolution = orchestrator
            .resolve_traced(&aapl())
            .await
            .expect("retry should resolve");

        assert_eq!(resolution.result.source, ResultSource::Live);
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(resolution.stages.contains(&PipelineStage::TokenRetry));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_then_reports() {
        let fetcher = StepFetcher::new(vec![
            Step::Fail(FetchError::rate_limited("429")),
            Step::Chain,
        ]);
        let orchestrator = orchestrator(StaticAcquirer::new(), fetcher.clone());

        let started = tokio::time::Instant::now();
        let error = orchestrator.resolve(&aapl()).await.expect_err("429 must surface");

        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(matches!(error, ResolveError::RateLimited { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overall_timeout_falls_back_to_synthetic() {
        let fetcher = StepFetcher::new(vec![Step::Hang]);
        let orchestrator = orchestrator(StaticAcquirer::new(), fetcher);

        let started = tokio::time::Instant::now();
        let resolution = orchestrator
            .resolve_traced(&aapl())
            .await
            .expect("fallback never fails");

        assert_eq!(started.elapsed(), Duration::from_secs(8));
        assert_eq!(resolution.result.source, ResultSource::Synthetic);
        assert_eq!(
            &resolution.stages[resolution.stages.len() - 3..],
            &[
                PipelineStage::CacheFallback,
                PipelineStage::SyntheticFallback,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_remote_cache_is_bounded_by_overall_timeout() {
        let remote = RemotePeer::new(Arc::new(StalledWorker), "https://worker.test");
        let orchestrator = Orchestrator::builder(PipelineConfig::default())
            .with_acquirer(StaticAcquirer::new())
            .with_fetcher(StepFetcher::new(vec![Step::Hang]))
            .with_remote(remote)
            .build();

        let started = tokio::time::Instant::now();
        let resolution = orchestrator
            .resolve_traced(&aapl())
            .await
            .expect("fallback never fails");

        assert_eq!(started.elapsed(), Duration::from_secs(16));
        assert_eq!(resolution.result.source, ResultSource::Synthetic);
        assert!(resolution
            .warnings
            .iter()
            .any(|warning| warning == "remote cache lookup exceeded 8000ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_many_keeps_input_order() {
        let fetcher = StepFetcher::new(vec![Step::Chain, Step::Chain]);
        let orchestrator = orchestrator(StaticAcquirer::new(), fetcher);
        let symbols = vec![aapl(), Symbol::parse("MSFT").expect("valid symbol")];

        let results = orchestrator.resolve_many(&symbols).await;

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().expect("resolves");
        let second = results[1].as_ref().expect("resolves");
        assert_eq!(first.symbol.as_str(), "AAPL");
        assert_eq!(second.symbol.as_str(), "MSFT");
    }
}
