//! Deterministic payload builders.
//!
//! Timestamps are written the way an exchange-local provider sends them:
//! naive `YYYY-MM-DD HH:MM:SS` for intraday rows and bare dates for daily rows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;

use candela_core::{Interval, RawCandle, RawPayload};

/// A flat bar at `close` (open/high/low derived from it).
#[must_use]
pub fn raw_candle(timestamp: impl Into<String>, close: Decimal) -> RawCandle {
    RawCandle {
        timestamp: timestamp.into(),
        open: close,
        high: close + Decimal::ONE,
        low: (close - Decimal::ONE).max(Decimal::new(1, 2)),
        close,
        volume: 1_000,
    }
}

/// `count` consecutive bars of `interval` starting at exchange-local `start`.
///
/// Prices climb by one cent per bar from `base`.
#[must_use]
pub fn intraday(
    symbol: &str,
    interval: Interval,
    start: NaiveDateTime,
    count: usize,
    base: Decimal,
) -> RawPayload {
    let step = TimeDelta::minutes(i64::from(interval.minutes().unwrap_or(1)));
    let rows = (0..count)
        .map(|i| {
            let offset = i32::try_from(i).unwrap_or(i32::MAX);
            let ts = start + step * offset;
            raw_candle(
                ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                base + Decimal::new(i64::from(offset), 2),
            )
        })
        .collect();
    RawPayload {
        symbol: symbol.to_string(),
        interval,
        rows,
    }
}

/// Every regular-session bar (09:30 up to 16:00) of `interval` on each of `days`.
#[must_use]
pub fn regular_sessions(
    symbol: &str,
    interval: Interval,
    days: &[NaiveDate],
    base: Decimal,
) -> RawPayload {
    let minutes = interval.minutes().unwrap_or(390);
    let per_day = usize::try_from(390 / minutes).unwrap_or(0);
    let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN);
    let mut rows = Vec::with_capacity(per_day * days.len());
    for day in days {
        rows.extend(intraday(symbol, interval, day.and_time(open), per_day, base).rows);
    }
    RawPayload {
        symbol: symbol.to_string(),
        interval,
        rows,
    }
}

/// One daily bar per date.
#[must_use]
pub fn daily(symbol: &str, dates: &[NaiveDate], base: Decimal) -> RawPayload {
    let rows = dates
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let step = i64::try_from(i).unwrap_or(i64::MAX);
            raw_candle(d.format("%Y-%m-%d").to_string(), base + Decimal::new(step, 0))
        })
        .collect();
    RawPayload {
        symbol: symbol.to_string(),
        interval: Interval::D1,
        rows,
    }
}
