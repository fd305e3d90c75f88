use chrono::{DateTime, TimeDelta, Utc};

use crate::{RetentionWindow, Series};

/// Trim `series` to `window`.
///
/// `Rows(n)` keeps the `n` most recent candles; `Duration(d)` drops candles
/// older than `now - d`. The most recent candle always survives, order is
/// preserved, and trimming an already trimmed series is a no-op.
#[must_use]
pub fn trim(series: &Series, window: RetentionWindow, now: DateTime<Utc>) -> Series {
    let candles = series.candles();
    let start = match window {
        RetentionWindow::Rows(n) => candles.len().saturating_sub(n.max(1)),
        RetentionWindow::Duration(d) => {
            let keep = TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX);
            let cutoff = now.checked_sub_signed(keep);
            let first_kept = cutoff.map_or(0, |cut| candles.partition_point(|c| c.ts < cut));
            first_kept.min(candles.len().saturating_sub(1))
        }
    };
    Series::from_sorted(series.key().clone(), candles[start..].to_vec())
}
