//! Crumb lifecycle: acquisition from upstream pages and a TTL-bounded store.
//!
//! The store owns the only copy of the current crumb. It is replaced by a
//! fresh acquisition and cleared by invalidation after an authorization
//! failure; nothing else mutates it.

mod acquirer;

pub use acquirer::{
    acquire_from_sources, decode_unicode_escapes, extract_token, PageTokenAcquirer, TokenAcquirer,
    TokenPattern, TokenSource, DEFAULT_TOKEN_SOURCES,
};

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::AcquisitionError;

/// Crumbs are reused for 30 minutes before a fresh page scrape.
pub const TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Opaque authorization value harvested from an upstream page.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    fetched_at: Instant,
}

impl Token {
    /// Stamps `value` with the current time.
    pub fn new(value: impl Into<String>) -> Self {
        Self::fetched_at(value, Instant::now())
    }

    pub fn fetched_at(value: impl Into<String>, fetched_at: Instant) -> Self {
        Self {
            value: value.into(),
            fetched_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub const fn fetched_instant(&self) -> Instant {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    /// Short prefix safe to put in logs.
    pub fn redacted(&self) -> String {
        let prefix = self.value.chars().take(4).collect::<String>();
        format!("{prefix}…")
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &self.redacted())
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Outcome of the most recent acquisition, guarded by the acquisition mutex.
#[derive(Default)]
struct AcquisitionRound {
    last_failure: Option<AcquisitionError>,
}

/// TTL-bounded holder of the current crumb.
///
/// Reads go through an `RwLock`; acquisitions are serialized by a separate
/// mutex so concurrent callers that find the store empty share one scrape,
/// whether it succeeds or fails.
#[derive(Clone)]
pub struct TokenStore {
    ttl: Duration,
    slot: Arc<RwLock<Option<Token>>>,
    acquisition: Arc<Mutex<AcquisitionRound>>,
    completed_rounds: Arc<AtomicU64>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(TOKEN_TTL)
    }
}

impl TokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Arc::new(RwLock::new(None)),
            acquisition: Arc::new(Mutex::new(AcquisitionRound::default())),
            completed_rounds: Arc::new(AtomicU64::new(0)),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the stored token while it is younger than the TTL.
    ///
    /// Expired tokens stay in the slot until the next `set` overwrites them.
    pub async fn get(&self) -> Option<Token> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|token| token.is_fresh(self.ttl))
            .cloned()
    }

    pub async fn set(&self, token: Token) {
        *self.slot.write().await = Some(token);
    }

    /// Unconditionally discards the stored token, whatever its age.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// Discards the stored token only if it is the one that was rejected.
    ///
    /// Returns `true` when the slot was cleared. A newer token written by a
    /// concurrent acquisition is left alone.
    pub async fn invalidate_if_current(&self, rejected: &Token) -> bool {
        let mut slot = self.slot.write().await;
        if slot.as_ref() == Some(rejected) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Returns a valid token, scraping one from `sources` if the store is empty.
    ///
    /// At most one acquisition runs at a time. Callers that queued behind an
    /// acquisition take its outcome: the stored token on success, the same
    /// error on failure.
    pub async fn get_or_acquire(
        &self,
        acquirer: &dyn TokenAcquirer,
        sources: &[TokenSource],
    ) -> Result<Token, AcquisitionError> {
        if let Some(token) = self.get().await {
            return Ok(token);
        }

        let observed = self.completed_rounds.load(Ordering::Acquire);
        let mut round = self.acquisition.lock().await;
        if let Some(token) = self.get().await {
            debug!(token = %token.redacted(), "reusing crumb acquired by a concurrent caller");
            return Ok(token);
        }
        if self.completed_rounds.load(Ordering::Acquire) != observed {
            if let Some(error) = &round.last_failure {
                debug!(%error, "sharing failed acquisition with a concurrent caller");
                return Err(error.clone());
            }
        }

        let outcome = acquire_from_sources(acquirer, sources).await;
        if let Ok(token) = &outcome {
            self.set(token.clone()).await;
        }
        round.last_failure = outcome.as_ref().err().cloned();
        self.completed_rounds.fetch_add(1, Ordering::Release);
        outcome
    }
}
