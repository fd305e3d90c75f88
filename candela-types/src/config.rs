//! Configuration types shared by the orchestrator, fetch client, and middleware.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CandelaError;
use crate::interval::{DataClass, Interval};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Provider quota configuration for the shared rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum provider calls per minute at backoff factor 1.
    pub calls_per_minute: u32,
    /// Upper bound for the adaptive backoff factor.
    pub max_backoff_factor: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_minute: 5,
            max_backoff_factor: 10.0,
        }
    }
}

/// Snapshot of the shared rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterState {
    /// Calls granted since construction.
    pub calls_granted: u64,
    /// Current adaptive backoff factor, within `[1, max_backoff_factor]`.
    pub backoff_factor: f64,
    /// Spacing currently enforced between granted calls.
    pub min_interval: Duration,
}

/// Retry policy applied to retryable provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first one.
    pub attempts: u32,
    /// Delay before the second attempt; doubles on every further attempt.
    pub base_backoff_ms: u64,
    /// Cap applied to any single backoff delay.
    pub max_backoff_ms: u64,
    /// Extra multiplier applied when the provider answered with a rate-limit signal.
    pub rate_limited_multiplier: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            rate_limited_multiplier: 4,
            jitter_percent: 10,
        }
    }
}

/// Maximum tolerated delta between consecutive candles before a gap is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    /// Tolerance for intraday series, measured in open-market time.
    pub intraday: Duration,
    /// Tolerance for daily series, measured in wall-clock time.
    pub daily: Duration,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            intraday: Duration::from_secs(2 * 3600),
            daily: Duration::from_secs(3 * 86_400),
        }
    }
}

impl GapConfig {
    /// Tolerance that applies to `interval`.
    #[must_use]
    pub const fn tolerance_for(&self, interval: Interval) -> Duration {
        match interval.data_class() {
            DataClass::Intraday => self.intraday,
            DataClass::Daily => self.daily,
        }
    }
}

/// How much history a series keeps after every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionWindow {
    /// Keep exactly the `n` most recent candles.
    Rows(usize),
    /// Keep candles no older than `now - d`.
    Duration(Duration),
}

/// Retention windows per data class with optional per-interval overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Default for intraday intervals without an override.
    pub intraday: RetentionWindow,
    /// Default for daily series.
    pub daily: RetentionWindow,
    /// Overrides keyed by interval.
    pub per_interval: BTreeMap<Interval, RetentionWindow>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let mut per_interval = BTreeMap::new();
        per_interval.insert(
            Interval::I1m,
            RetentionWindow::Duration(Duration::from_secs(7 * 86_400)),
        );
        Self {
            intraday: RetentionWindow::Rows(500),
            daily: RetentionWindow::Rows(200),
            per_interval,
        }
    }
}

impl RetentionConfig {
    /// Window applied to `interval`: the override if present, else the class default.
    #[must_use]
    pub fn window_for(&self, interval: Interval) -> RetentionWindow {
        if let Some(w) = self.per_interval.get(&interval) {
            return *w;
        }
        match interval.data_class() {
            DataClass::Intraday => self.intraday,
            DataClass::Daily => self.daily,
        }
    }
}

/// Freshness validation toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// When true, a series without a candle for today during the regular
    /// session fails validation and triggers a heal.
    pub enabled: bool,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Inputs to the minimal-vs-full fetch decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Coverage ratio at or above which a minimal fetch suffices.
    pub required_coverage: f64,
    /// Lookback window in days for intraday coverage.
    pub intraday_lookback_days: u32,
    /// Lookback window in days for daily coverage.
    pub daily_lookback_days: u32,
    /// Stored intraday series smaller than this are rebuilt with a full fetch.
    pub intraday_min_bytes: u64,
    /// Stored daily series smaller than this are rebuilt with a full fetch.
    pub daily_min_bytes: u64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            required_coverage: 0.95,
            intraday_lookback_days: 7,
            daily_lookback_days: 30,
            intraday_min_bytes: 50 * KIB,
            daily_min_bytes: 4 * KIB,
        }
    }
}

impl CoverageConfig {
    /// Lookback days for the data class of `interval`.
    #[must_use]
    pub const fn lookback_days(&self, interval: Interval) -> u32 {
        match interval.data_class() {
            DataClass::Intraday => self.intraday_lookback_days,
            DataClass::Daily => self.daily_lookback_days,
        }
    }

    /// Minimum stored size for the data class of `interval`.
    #[must_use]
    pub const fn min_bytes(&self, interval: Interval) -> u64 {
        match interval.data_class() {
            DataClass::Intraday => self.intraday_min_bytes,
            DataClass::Daily => self.daily_min_bytes,
        }
    }
}

/// Budgets and defaults for the tiered fetch cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memory tier budget in serialized bytes.
    pub memory_bytes: u64,
    /// Disk tier budget in bytes.
    pub disk_bytes: u64,
    /// TTL used for provider results.
    pub default_ttl: Duration,
    /// Disk tier directory. `None` disables the disk tier.
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_bytes: 100 * MIB,
            disk_bytes: 1024 * MIB,
            default_ttl: Duration::from_secs(300),
            dir: None,
        }
    }
}

/// Exchange trading hours in exchange-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketHours {
    /// Exchange timezone.
    pub timezone: Tz,
    /// Start of the extended (pre-market) session.
    pub pre_market_open: NaiveTime,
    /// Regular session open.
    pub regular_open: NaiveTime,
    /// Regular session close; daily candles are anchored here.
    pub regular_close: NaiveTime,
    /// End of the after-hours session.
    pub after_hours_close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            pre_market_open: NaiveTime::from_hms_opt(4, 0, 0).unwrap_or(NaiveTime::MIN),
            regular_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            regular_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            after_hours_close: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl MarketHours {
    /// Length of the regular session in minutes.
    #[must_use]
    pub fn regular_minutes(&self) -> i64 {
        (self.regular_close - self.regular_open).num_minutes()
    }
}

/// Global configuration for the `Candela` orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandelaConfig {
    /// Shared provider quota.
    pub rate_limit: RateLimitConfig,
    /// Retry policy for retryable provider failures.
    pub retry: RetryConfig,
    /// Timeout for an individual provider call. A timeout counts as one attempt.
    pub provider_timeout: Duration,
    /// Number of workers draining a batch.
    pub concurrency: usize,
    /// Gap tolerances.
    pub gaps: GapConfig,
    /// Retention windows.
    pub retention: RetentionConfig,
    /// Freshness validation.
    pub freshness: FreshnessConfig,
    /// Fetch-size decision inputs.
    pub coverage: CoverageConfig,
    /// Tiered cache budgets.
    pub cache: CacheConfig,
    /// Exchange trading hours.
    pub market: MarketHours,
}

impl Default for CandelaConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            provider_timeout: Duration::from_secs(30),
            concurrency: 5,
            gaps: GapConfig::default(),
            retention: RetentionConfig::default(),
            freshness: FreshnessConfig::default(),
            coverage: CoverageConfig::default(),
            cache: CacheConfig::default(),
            market: MarketHours::default(),
        }
    }
}

impl CandelaConfig {
    /// Parse a JSON document; missing fields take their defaults. The result is validated.
    ///
    /// # Errors
    /// Returns `CandelaError::Config` when the document is malformed or fails validation.
    pub fn from_json_str(s: &str) -> Result<Self, CandelaError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| CandelaError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `CandelaError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<(), CandelaError> {
        let bad = |m: &str| Err(CandelaError::Config(m.to_string()));

        if self.rate_limit.calls_per_minute == 0 {
            return bad("rate_limit.calls_per_minute must be positive");
        }
        if self.rate_limit.max_backoff_factor.is_nan() || self.rate_limit.max_backoff_factor < 1.0 {
            return bad("rate_limit.max_backoff_factor must be >= 1");
        }
        if self.retry.attempts == 0 {
            return bad("retry.attempts must be at least 1");
        }
        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            return bad("retry.base_backoff_ms must not exceed retry.max_backoff_ms");
        }
        if self.retry.jitter_percent > 100 {
            return bad("retry.jitter_percent must be within [0, 100]");
        }
        if self.provider_timeout.is_zero() {
            return bad("provider_timeout must be positive");
        }
        if self.concurrency == 0 {
            return bad("concurrency must be at least 1");
        }
        let cov = self.coverage.required_coverage;
        if cov.is_nan() || cov <= 0.0 || cov > 1.0 {
            return bad("coverage.required_coverage must be within (0, 1]");
        }
        let windows = [self.retention.intraday, self.retention.daily]
            .into_iter()
            .chain(self.retention.per_interval.values().copied());
        for w in windows {
            match w {
                RetentionWindow::Rows(0) => return bad("retention rows must be positive"),
                RetentionWindow::Duration(d) if d.is_zero() => {
                    return bad("retention duration must be positive");
                }
                _ => {}
            }
        }
        let m = &self.market;
        if !(m.pre_market_open <= m.regular_open
            && m.regular_open < m.regular_close
            && m.regular_close <= m.after_hours_close)
        {
            return bad("market hours must be ordered pre <= open < close <= after-hours");
        }
        Ok(())
    }
}
