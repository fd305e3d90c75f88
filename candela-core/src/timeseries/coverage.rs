use chrono::{DateTime, Days, Utc};

use crate::market::{MarketSession, local_date, session_at, trading_days_between};
use crate::{Interval, MarketHours, Series};

/// Candles a complete trading day holds for `interval` in the regular session.
#[must_use]
pub fn bars_per_day(interval: Interval, hours: &MarketHours) -> u64 {
    interval.minutes().map_or(1, |m| {
        u64::try_from(hours.regular_minutes()).unwrap_or(0) / u64::from(m)
    })
}

/// Ratio of present to expected candles over the `lookback_days` complete
/// exchange-local days before today.
///
/// Intraday candles count only inside the regular session. The ratio is
/// capped at 1, and an empty expectation yields 1.
#[must_use]
pub fn coverage_ratio(
    series: &Series,
    now: DateTime<Utc>,
    lookback_days: u32,
    hours: &MarketHours,
) -> f64 {
    let today = local_date(hours, now);
    let from = today
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(today);
    let interval = series.interval();
    let expected = u64::from(trading_days_between(from, today)) * bars_per_day(interval, hours);
    if expected == 0 {
        return 1.0;
    }

    let present = series
        .candles()
        .iter()
        .filter(|c| {
            let d = local_date(hours, c.ts);
            d >= from
                && d < today
                && (!interval.is_intraday() || session_at(hours, c.ts) == MarketSession::Regular)
        })
        .count();

    #[allow(clippy::cast_precision_loss)]
    let ratio = present as f64 / expected as f64;
    ratio.min(1.0)
}
