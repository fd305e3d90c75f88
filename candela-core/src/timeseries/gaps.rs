//! Gap and freshness detection.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market::{
    MarketSession, local_date, open_market_time, previous_trading_day, session_at,
};
use crate::{CandelaError, DataClass, MarketHours, Series};

/// A discontinuity between two consecutive candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Timestamp of the candle before the gap.
    pub start: DateTime<Utc>,
    /// Timestamp of the candle after the gap.
    pub end: DateTime<Utc>,
    /// Measured delta: open-market time for intraday, wall-clock for daily.
    pub duration: Duration,
}

/// Ordered list of gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    /// Gaps in ascending order of `start`.
    pub gaps: Vec<Gap>,
}

impl GapReport {
    /// True when no gap was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Number of gaps.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.gaps.len()
    }

    /// Gaps whose right edge is at or after `ts`.
    pub fn ending_at_or_after(&self, ts: DateTime<Utc>) -> impl Iterator<Item = &Gap> {
        self.gaps.iter().filter(move |g| g.end >= ts)
    }

    /// Gaps reaching into `chunk` that `chunk` itself does not reproduce.
    ///
    /// A gap whose edges are adjacent candles of `chunk` is a hole in the
    /// provider's own data (a holiday or a halt); refetching returns it again.
    pub fn repairable_from<'a>(
        &'a self,
        chunk: &'a Series,
    ) -> impl Iterator<Item = &'a Gap> + 'a {
        let candles = chunk.candles();
        let first = candles.first().map_or(DateTime::<Utc>::MAX_UTC, |c| c.ts);
        self.ending_at_or_after(first)
            .filter(move |g| {
                let reproduced = candles
                    .binary_search_by_key(&g.start, |c| c.ts)
                    .is_ok_and(|i| candles.get(i + 1).is_some_and(|next| next.ts == g.end));
                !reproduced
            })
    }
}

/// Report every consecutive delta above `tolerance`.
///
/// Intraday deltas only count time inside the extended trading session
/// (04:00 to 20:00 exchange time on weekdays), not the raw timestamp delta.
/// Nights and weekends are therefore not gaps while a missing trading day is,
/// and a 19:00 to 00:00 jump counts as one hour. Daily deltas are wall-clock.
#[must_use]
pub fn detect_gaps(series: &Series, tolerance: Duration, hours: &MarketHours) -> GapReport {
    let intraday = series.interval().is_intraday();
    let gaps = series
        .candles()
        .windows(2)
        .filter_map(|w| {
            let (a, b) = (w[0].ts, w[1].ts);
            let delta = if intraday {
                open_market_time(hours, a, b)
            } else {
                b - a
            };
            let delta = delta.to_std().unwrap_or(Duration::ZERO);
            (delta > tolerance).then_some(Gap {
                start: a,
                end: b,
                duration: delta,
            })
        })
        .collect();
    GapReport { gaps }
}

/// Whether `now` falls in the window where fresh data is required.
#[must_use]
pub fn freshness_required(now: DateTime<Utc>, hours: &MarketHours) -> bool {
    session_at(hours, now) == MarketSession::Regular
}

/// Require today's data while the regular session is open.
///
/// Intraday series must contain a candle dated today (exchange-local). Daily
/// series must reach at least the previous trading day, since today's bar is
/// only final after the close. Outside the regular session every series passes.
///
/// # Errors
/// Returns `Validation` describing the stale series.
pub fn check_freshness(
    series: &Series,
    now: DateTime<Utc>,
    hours: &MarketHours,
) -> Result<(), CandelaError> {
    if !freshness_required(now, hours) {
        return Ok(());
    }
    let today = local_date(hours, now);
    let Some(last) = series.last() else {
        return Err(CandelaError::Validation(format!(
            "{} has no candles during the trading session",
            series.key()
        )));
    };
    let last_date = local_date(hours, last.ts);
    let required = match series.interval().data_class() {
        DataClass::Intraday => today,
        DataClass::Daily => previous_trading_day(today),
    };
    if last_date < required {
        return Err(CandelaError::Validation(format!(
            "{} is stale: latest candle {last_date}, expected {required} or later",
            series.key()
        )));
    }
    Ok(())
}
