use std::sync::Arc;
use std::time::Duration;

use candela_core::{
    CandelaConfig, CandelaError, CandleConnector, Clock, SeriesStore, SystemClock,
};
use candela_middleware::{CacheStats, RateLimiter, TieredCache};
use candela_types::{
    CacheConfig, CoverageConfig, GapConfig, MarketHours, RateLimitConfig, RateLimiterState,
    RetentionConfig, RetryConfig,
};

use crate::pipeline::fetch::ConcurrentFetchClient;
use crate::pipeline::strategy::FetchStrategyDecider;

/// Orchestrator that runs ingestion cycles against one provider and one store.
pub struct Candela {
    pub(crate) store: Arc<dyn SeriesStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) fetcher: ConcurrentFetchClient,
    pub(crate) decider: FetchStrategyDecider,
    pub(crate) cfg: CandelaConfig,
}

/// Builder for constructing a `Candela` orchestrator with custom configuration.
pub struct CandelaBuilder {
    connector: Option<Arc<dyn CandleConnector>>,
    store: Option<Arc<dyn SeriesStore>>,
    clock: Option<Arc<dyn Clock>>,
    cfg: CandelaConfig,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Create a new builder with default configuration.
    ///
    /// Behavior and trade-offs:
    /// - Starts with no provider and no store; both are required by [`build`](Self::build).
    /// - Defaults follow a free-tier quota: 5 calls per minute, 3 attempts per
    ///   fetch, 30s provider timeout, 5 concurrent workers.
    /// - Uses [`SystemClock`] unless a clock is supplied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connector: None,
            store: None,
            clock: None,
            cfg: CandelaConfig::default(),
        }
    }

    /// Register the provider connector. Replaces any previously registered one.
    #[must_use]
    pub fn with_provider(mut self, c: Arc<dyn CandleConnector>) -> Self {
        self.connector = Some(c);
        self
    }

    /// Register the series store.
    #[must_use]
    pub fn with_store(mut self, s: Arc<dyn SeriesStore>) -> Self {
        self.store = Some(s);
        self
    }

    /// Supply the clock used for every "now" (freshness, coverage, retention).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the whole configuration, e.g. one loaded with
    /// [`CandelaConfig::from_json_str`].
    ///
    /// Later setters still override individual fields.
    #[must_use]
    pub fn config(mut self, cfg: CandelaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the provider quota and backoff ceiling.
    ///
    /// Behavior and trade-offs:
    /// - The limiter spaces calls by `60 / calls_per_minute` seconds, widened by the
    ///   current backoff factor after rate-limit signals.
    /// - A lower rate avoids provider penalties at the cost of batch latency.
    #[must_use]
    pub const fn rate_limit(mut self, cfg: RateLimitConfig) -> Self {
        self.cfg.rate_limit = cfg;
        self
    }

    /// Set retry attempts and backoff bounds for transient provider failures.
    #[must_use]
    pub const fn retry(mut self, cfg: RetryConfig) -> Self {
        self.cfg.retry = cfg;
        self
    }

    /// Set the per-call provider timeout. A timed-out call counts as one attempt.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout = timeout;
        self
    }

    /// Number of symbols processed concurrently in a batch.
    ///
    /// Workers still share one rate limiter, so raising this mostly overlaps
    /// provider latency rather than adding throughput.
    #[must_use]
    pub const fn concurrency(mut self, workers: usize) -> Self {
        self.cfg.concurrency = workers;
        self
    }

    /// Set gap tolerances per data class.
    #[must_use]
    pub const fn gaps(mut self, cfg: GapConfig) -> Self {
        self.cfg.gaps = cfg;
        self
    }

    /// Set retention windows.
    #[must_use]
    pub fn retention(mut self, cfg: RetentionConfig) -> Self {
        self.cfg.retention = cfg;
        self
    }

    /// Toggle the in-session freshness requirement.
    #[must_use]
    pub const fn freshness(mut self, enabled: bool) -> Self {
        self.cfg.freshness.enabled = enabled;
        self
    }

    /// Set the thresholds used to pick between minimal and full fetches.
    #[must_use]
    pub const fn coverage(mut self, cfg: CoverageConfig) -> Self {
        self.cfg.coverage = cfg;
        self
    }

    /// Configure the payload cache.
    ///
    /// Behavior and trade-offs:
    /// - Without a `dir` only the memory tier is used.
    /// - A zero `default_ttl` disables caching of fetched payloads.
    #[must_use]
    pub fn cache(mut self, cfg: CacheConfig) -> Self {
        self.cfg.cache = cfg;
        self
    }

    /// Set the exchange timezone and session boundaries.
    #[must_use]
    pub const fn market(mut self, hours: MarketHours) -> Self {
        self.cfg.market = hours;
        self
    }

    /// Build the `Candela` orchestrator.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no provider or no store was registered, and
    /// `Config` if the configuration does not validate.
    pub fn build(self) -> Result<Candela, CandelaError> {
        self.cfg.validate()?;

        let Some(connector) = self.connector else {
            return Err(CandelaError::InvalidArg(
                "no provider registered; add one via with_provider(...)".to_string(),
            ));
        };
        let Some(store) = self.store else {
            return Err(CandelaError::InvalidArg(
                "no store registered; add one via with_store(...)".to_string(),
            ));
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let limiter = Arc::new(RateLimiter::new(self.cfg.rate_limit));
        let cache = Arc::new(TieredCache::new(&self.cfg.cache));
        let fetcher = ConcurrentFetchClient::new(
            connector,
            limiter,
            cache,
            self.cfg.retry,
            self.cfg.provider_timeout,
        );
        let decider = FetchStrategyDecider::new(self.cfg.coverage, self.cfg.market);

        tracing::debug!(
            provider = fetcher.provider_name(),
            concurrency = self.cfg.concurrency,
            calls_per_minute = self.cfg.rate_limit.calls_per_minute,
            "candela orchestrator built"
        );

        Ok(Candela {
            store,
            clock,
            fetcher,
            decider,
            cfg: self.cfg,
        })
    }
}

impl Candela {
    /// Wrap a provider future with a timeout and standardized timeout error mapping.
    #[tracing::instrument(
        name = "candela::core::provider_call_with_timeout",
        skip(fut),
        fields(
            provider = provider_name,
            capability = capability,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        ),
    )]
    pub(crate) async fn provider_call_with_timeout<T, Fut>(
        provider_name: &'static str,
        capability: &'static str,
        timeout: Duration,
        fut: Fut,
    ) -> Result<T, CandelaError>
    where
        Fut: core::future::Future<Output = Result<T, CandelaError>>,
    {
        (tokio::time::timeout(timeout, fut).await)
            .unwrap_or_else(|_| Err(CandelaError::provider_timeout(provider_name, capability)))
    }

    /// Start building a new `Candela` instance.
    ///
    /// ```rust,ignore
    /// let candela = candela::Candela::builder()
    ///     .with_provider(provider)
    ///     .with_store(store)
    ///     .provider_timeout(std::time::Duration::from_secs(10))
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CandelaConfig {
        &self.cfg
    }

    /// The fetch client, for callers that want raw payloads without a cycle.
    #[must_use]
    pub const fn fetcher(&self) -> &ConcurrentFetchClient {
        &self.fetcher
    }

    /// The fetch-size decider bound to this orchestrator's configuration.
    #[must_use]
    pub const fn decider(&self) -> &FetchStrategyDecider {
        &self.decider
    }

    /// Point-in-time view of the shared rate limiter.
    #[must_use]
    pub fn limiter_state(&self) -> RateLimiterState {
        self.fetcher.limiter().snapshot()
    }

    /// Payload cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.fetcher.cache().stats()
    }
}
