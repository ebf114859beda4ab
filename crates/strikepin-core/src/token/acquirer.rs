use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::http_client::{HttpClient, HttpRequest};
use crate::token::Token;
use crate::AcquisitionError;

/// Quote pages known to embed a crumb, primary first.
pub const DEFAULT_TOKEN_SOURCES: [&str; 6] = ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA"];

const PAGE_HEADERS: [(&str, &str); 6] = [
    ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    ("accept-language", "en-US,en;q=0.9"),
    ("referer", "https://www.google.com/"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "cross-site"),
];

static INLINE_CRUMB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""crumb":"((?:[A-Za-z0-9.\-_]|\\u[0-9a-fA-F]{4})+)""#)
        .expect("inline crumb pattern is valid")
});

static CRUMB_STORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""CrumbStore":\s*\{\s*"crumb":\s*"([^"]+)""#)
        .expect("crumb store pattern is valid")
});

static UNICODE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\u([0-9a-fA-F]{4})").expect("unicode escape pattern is valid")
});

/// A page on the finance host that may carry a crumb, identified by ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenSource(String);

impl TokenSource {
    pub fn new(page: impl Into<String>) -> Self {
        Self(page.into())
    }

    /// The built-in primary page followed by its alternates.
    pub fn defaults() -> Vec<Self> {
        DEFAULT_TOKEN_SOURCES.iter().map(|page| Self::new(*page)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TokenSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a crumb may be embedded in page markup, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPattern {
    /// `"crumb":"value"` anywhere in the document.
    Inline,
    /// `"CrumbStore": { "crumb": "value" }` in the hydration payload.
    CrumbStore,
}

impl TokenPattern {
    pub const ORDERED: [Self; 2] = [Self::Inline, Self::CrumbStore];

    fn regex(self) -> &'static Regex {
        match self {
            Self::Inline => &*INLINE_CRUMB,
            Self::CrumbStore => &*CRUMB_STORE,
        }
    }

    /// Raw (still escaped) crumb matched by this pattern.
    pub fn find(self, body: &str) -> Option<&str> {
        self.regex()
            .captures(body)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Extracts and decodes a crumb, trying [`TokenPattern::ORDERED`] in sequence.
pub fn extract_token(body: &str) -> Option<String> {
    TokenPattern::ORDERED.iter().find_map(|pattern| {
        pattern.find(body).map(|raw| {
            debug!(pattern = ?pattern, "crumb pattern matched");
            decode_unicode_escapes(raw)
        })
    })
}

/// Replaces `\uXXXX` sequences with the characters they encode.
///
/// Sequences that do not name a scalar value (lone surrogates) are kept verbatim.
pub fn decode_unicode_escapes(raw: &str) -> String {
    UNICODE_ESCAPE
        .replace_all(raw, |captures: &Captures<'_>| {
            u32::from_str_radix(&captures[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| captures[0].to_owned())
        })
        .into_owned()
}

/// Capability that turns one token source into a crumb.
///
/// The page-scraping strategy is brittle by nature; keeping it behind this
/// trait lets the orchestrator stay unchanged when the markup changes.
pub trait TokenAcquirer: Send + Sync {
    fn acquire<'a>(
        &'a self,
        source: &'a TokenSource,
    ) -> Pin<Box<dyn Future<Output = Result<Token, AcquisitionError>> + Send + 'a>>;
}

/// Tries each source in order and returns the first crumb found.
pub async fn acquire_from_sources(
    acquirer: &dyn TokenAcquirer,
    sources: &[TokenSource],
) -> Result<Token, AcquisitionError> {
    for (index, source) in sources.iter().enumerate() {
        match acquirer.acquire(source).await {
            Ok(token) => {
                info!(
                    page = %source,
                    attempt = index + 1,
                    token = %token.redacted(),
                    "acquired crumb"
                );
                return Ok(token);
            }
            Err(error) => {
                warn!(page = %source, attempt = index + 1, %error, "crumb acquisition failed");
            }
        }
    }

    Err(AcquisitionError::Exhausted {
        attempted: sources.len(),
    })
}

/// Scrapes crumbs from quote pages on the finance host.
#[derive(Clone)]
pub struct PageTokenAcquirer {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl PageTokenAcquirer {
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

    fn page_url(&self, source: &TokenSource) -> String {
        format!(
            "{}/quote/{}",
            self.base_url,
            urlencoding::encode(source.as_str())
        )
    }
}

impl TokenAcquirer for PageTokenAcquirer {
    fn acquire<'a>(
        &'a self,
        source: &'a TokenSource,
    ) -> Pin<Box<dyn Future<Output = Result<Token, AcquisitionError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.page_url(source))
                .with_headers(PAGE_HEADERS)
                .with_timeout_ms(self.timeout_ms);

            let response = self.http_client.execute(request).await.map_err(|error| {
                AcquisitionError::Transport {
                    page: source.to_string(),
                    message: error.message().to_owned(),
                }
            })?;

            if !response.is_success() {
                return Err(AcquisitionError::Status {
                    page: source.to_string(),
                    status: response.status,
                });
            }

            extract_token(&response.body)
                .map(Token::new)
                .ok_or_else(|| AcquisitionError::NoTokenFound {
                    page: source.to_string(),
                })
        })
    }
}
