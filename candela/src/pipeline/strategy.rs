use chrono::{DateTime, Utc};

use candela_core::timeseries::coverage::coverage_ratio;
use candela_core::{CoverageConfig, FetchSize, MarketHours, SeriesKey, StoredSeries};

/// Chooses between a minimal and a full fetch for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchStrategyDecider {
    coverage: CoverageConfig,
    market: MarketHours,
}

impl FetchStrategyDecider {
    /// Decider using the given coverage thresholds and exchange calendar.
    #[must_use]
    pub const fn new(coverage: CoverageConfig, market: MarketHours) -> Self {
        Self { coverage, market }
    }

    /// Pick the fetch size for `key`.
    ///
    /// `Full` when forced, when nothing is stored, when the stored size is below
    /// the data class minimum, or when coverage over the lookback window is
    /// below the required ratio. `Minimal` otherwise.
    #[must_use]
    pub fn decide(
        &self,
        key: &SeriesKey,
        existing: Option<&StoredSeries>,
        force_full: bool,
        now: DateTime<Utc>,
    ) -> FetchSize {
        if force_full {
            tracing::debug!(series = %key, "full fetch forced");
            return FetchSize::Full;
        }
        let Some(stored) = existing else {
            tracing::debug!(series = %key, "no stored series; full fetch");
            return FetchSize::Full;
        };

        let min_bytes = self.coverage.min_bytes(key.interval);
        if stored.size_bytes < min_bytes {
            tracing::debug!(
                series = %key,
                size_bytes = stored.size_bytes,
                min_bytes,
                "stored series too small; full fetch"
            );
            return FetchSize::Full;
        }

        let lookback = self.coverage.lookback_days(key.interval);
        let ratio = coverage_ratio(&stored.series, now, lookback, &self.market);
        if ratio < self.coverage.required_coverage {
            tracing::debug!(
                series = %key,
                coverage = ratio,
                required = self.coverage.required_coverage,
                "coverage below threshold; full fetch"
            );
            return FetchSize::Full;
        }
        FetchSize::Minimal
    }
}
