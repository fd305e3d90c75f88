//! Candela ingests OHLCV candles from a rate-limited provider into local storage.
//!
//! Overview
//! - Decides per symbol whether a minimal (recent window) or full (history) fetch
//!   is needed, based on what storage already holds.
//! - Throttles every provider call through one shared [`RateLimiter`] with adaptive
//!   backoff, retries transient failures, and caches payloads in a [`TieredCache`].
//! - Standardizes provider timestamps to canonical UTC, merges them idempotently
//!   into the stored series, and checks the result for gaps and staleness.
//! - Heals a damaged series with one full refetch that replaces it wholesale,
//!   but only when the replacement is itself valid.
//! - Trims each series to its retention window before handing it to storage.
//!
//! Key behaviors and trade-offs
//! - Fetch size: `Full` when nothing usable is stored, the stored payload is
//!   suspiciously small, or coverage over the lookback window is below the
//!   configured ratio; `Minimal` otherwise. Minimal fetches cost one call and a
//!   small payload but only refresh the recent window.
//! - Merge: existing candles win except for the single most recent one, which
//!   is refreshed from the incoming bar (a still-forming candle).
//! - Errors: transient provider errors are retried with exponential backoff and
//!   end the cycle as failed once attempts run out; hard provider rejections are
//!   not retried. A failed cycle never writes to storage.
//! - Batches: a bounded pool of workers drains a shared symbol queue; one
//!   symbol's failure never blocks another.
//!
//! Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{Candela, Interval};
//!
//! let candela = Candela::builder()
//!     .with_provider(provider)
//!     .with_store(store)
//!     .concurrency(5)
//!     .build()?;
//!
//! let report = candela.run_batch(&["AAPL", "MSFT"], Interval::I1m, false).await?;
//! println!("{}", report.summary());
//! ```
#![warn(missing_docs)]

pub(crate) mod core;
mod pipeline;

pub use core::{Candela, CandelaBuilder};
pub use pipeline::fetch::{ConcurrentFetchClient, FetchOutcome, FetchResult};
pub use pipeline::strategy::FetchStrategyDecider;

pub use candela_middleware::{CacheStats, RateLimiter, TieredCache, cache_key};

// Re-export core types for convenience
pub use candela_core::{
    BatchReport, CacheConfig, CandelaConfig, CandelaError, Candle, CandleConnector, Capability,
    Clock, CoverageConfig, CycleReport, CycleState, DataClass, FetchMode, FetchRequest, FetchSize,
    FreshnessConfig, FullProvider, GapConfig, HealOutcome, Interval, MarketHours, MarketSession,
    MinimalProvider, RateLimitConfig, RateLimiterState, RawCandle, RawPayload, RetentionConfig,
    RetentionWindow, RetryConfig, Series, SeriesKey, SeriesStore, StoredSeries, SystemClock,
};

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
