//! Rate-limited, retrying, cache-aware provider calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use candela_core::connector::fetch_with;
use candela_core::{
    CandelaError, CandleConnector, FetchMode, FetchRequest, FetchSize, Interval, RawPayload,
};
use candela_middleware::{RateLimiter, TieredCache, cache_key};
use candela_types::RetryConfig;

use crate::Candela;
use crate::pipeline::backoff::retry_delay;

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Payload obtained from the provider or the cache.
    Success(RawPayload),
    /// Transient failure that persisted through every attempt.
    SoftError(CandelaError),
    /// Failure that is not worth retrying.
    HardError(CandelaError),
}

/// Result of one [`ConcurrentFetchClient::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The request this result answers.
    pub request: FetchRequest,
    /// Payload or classified error.
    pub outcome: FetchOutcome,
    /// Provider calls made; zero for a cache hit.
    pub attempts: u32,
    /// Whether the payload came from the cache.
    pub from_cache: bool,
}

impl FetchResult {
    /// Whether a payload was obtained.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success(_))
    }

    /// The fetched payload, if any.
    #[must_use]
    pub const fn chunk(&self) -> Option<&RawPayload> {
        match &self.outcome {
            FetchOutcome::Success(p) => Some(p),
            FetchOutcome::SoftError(_) | FetchOutcome::HardError(_) => None,
        }
    }

    /// Collapse into a plain `Result`.
    ///
    /// # Errors
    /// Returns the soft or hard error that ended the fetch.
    pub fn into_result(self) -> Result<RawPayload, CandelaError> {
        match self.outcome {
            FetchOutcome::Success(p) => Ok(p),
            FetchOutcome::SoftError(e) | FetchOutcome::HardError(e) => Err(e),
        }
    }
}

/// Issues provider calls through the shared limiter and cache.
///
/// Cloning is cheap; clones share the connector, limiter, and cache.
#[derive(Clone)]
pub struct ConcurrentFetchClient {
    connector: Arc<dyn CandleConnector>,
    limiter: Arc<RateLimiter>,
    cache: Arc<TieredCache<RawPayload>>,
    retry: RetryConfig,
    timeout: Duration,
}

impl ConcurrentFetchClient {
    /// Bind a connector to a limiter and cache.
    #[must_use]
    pub fn new(
        connector: Arc<dyn CandleConnector>,
        limiter: Arc<RateLimiter>,
        cache: Arc<TieredCache<RawPayload>>,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            limiter,
            cache,
            retry,
            timeout,
        }
    }

    /// Name of the underlying provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.connector.name()
    }

    /// The shared rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The payload cache.
    #[must_use]
    pub fn cache(&self) -> &TieredCache<RawPayload> {
        &self.cache
    }

    /// Fetch one payload.
    ///
    /// Behavior:
    /// - `Regular` requests are served from the cache when possible; `Heal`
    ///   requests always reach the provider.
    /// - Every provider call waits for the limiter and is bounded by the
    ///   provider timeout; a timeout counts as an attempt.
    /// - Network errors, timeouts, and rate limits are retried with exponential
    ///   backoff; rate limits also widen the limiter's spacing.
    /// - Anything else fails on the first attempt.
    /// - Successful payloads are cached with the default TTL.
    #[tracing::instrument(
        name = "candela::fetch",
        skip(self, request),
        fields(symbol = %request.symbol, interval = %request.interval, size = %request.size),
    )]
    pub async fn fetch(&self, request: FetchRequest) -> FetchResult {
        let key = cache_key(&request.symbol, request.interval, request.size);
        if request.mode == FetchMode::Regular
            && let Some(payload) = self.cache.get(&key).await
        {
            tracing::debug!(key = %key, rows = payload.rows.len(), "served from cache");
            return FetchResult {
                request,
                outcome: FetchOutcome::Success(payload),
                attempts: 0,
                from_cache: true,
            };
        }

        let provider = self.connector.name();
        let capability = request.size.capability().as_str();
        let max_attempts = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;
            let call = fetch_with(
                self.connector.as_ref(),
                &request.symbol,
                request.interval,
                request.size,
            );
            let result =
                Candela::provider_call_with_timeout(provider, capability, self.timeout, call).await;

            let err = match result {
                Ok(payload) => {
                    self.limiter.on_success();
                    if let Err(e) = self.cache.set_default(&key, payload.clone()).await {
                        tracing::warn!(key = %key, error = %e, "failed to cache payload");
                    }
                    tracing::debug!(attempt, rows = payload.rows.len(), "fetch succeeded");
                    return FetchResult {
                        request,
                        outcome: FetchOutcome::Success(payload),
                        attempts: attempt,
                        from_cache: false,
                    };
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                tracing::warn!(attempt, error = %err, "fetch failed without retry");
                return FetchResult {
                    request,
                    outcome: FetchOutcome::HardError(err),
                    attempts: attempt,
                    from_cache: false,
                };
            }

            let rate_limited = err.is_rate_limited();
            if rate_limited {
                self.limiter.on_rate_limit();
            }
            if attempt >= max_attempts {
                tracing::warn!(attempt, error = %err, "fetch attempts exhausted");
                return FetchResult {
                    request,
                    outcome: FetchOutcome::SoftError(err),
                    attempts: attempt,
                    from_cache: false,
                };
            }

            let delay = retry_delay(&self.retry, attempt, rate_limited);
            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "retrying fetch"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Fetch `size` for every symbol with at most `max_concurrent` in flight.
    ///
    /// Results are keyed by the symbol as given. A failure for one symbol is
    /// recorded in its own entry and never cancels the others.
    pub async fn fetch_many(
        &self,
        symbols: &[String],
        interval: Interval,
        size: FetchSize,
        max_concurrent: usize,
    ) -> HashMap<String, FetchResult> {
        futures::stream::iter(symbols.iter().cloned())
            .map(|symbol| {
                let request = FetchRequest::new(symbol.clone(), interval, size);
                async move { (symbol, self.fetch(request).await) }
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await
    }
}
