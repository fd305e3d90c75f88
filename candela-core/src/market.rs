//! Exchange calendar helpers: sessions, trading days, and open-market time.
//!
//! Trading days are weekdays; exchange holidays are not modelled.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::MarketHours;

/// Trading session at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSession {
    /// Extended hours before the regular open.
    PreMarket,
    /// Regular trading hours.
    Regular,
    /// Extended hours after the regular close.
    AfterHours,
    /// Overnight, weekends.
    Closed,
}

impl MarketSession {
    /// True for pre-market, regular, and after-hours.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Exchange-local calendar date of `ts`.
#[must_use]
pub fn local_date(hours: &MarketHours, ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&hours.timezone).date_naive()
}

/// Weekdays are trading days.
#[must_use]
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Most recent trading day strictly before `date`.
#[must_use]
pub fn previous_trading_day(date: NaiveDate) -> NaiveDate {
    let mut d = date;
    loop {
        d = d.pred_opt().unwrap_or(NaiveDate::MIN);
        if is_trading_day(d) || d == NaiveDate::MIN {
            return d;
        }
    }
}

/// UTC instant of exchange-local `date` at wall-clock `time`.
///
/// Ambiguous local times resolve to the earliest instant; `None` for local
/// times skipped by a DST transition.
#[must_use]
pub fn at_local(hours: &MarketHours, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    hours
        .timezone
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Session in effect at `ts`.
#[must_use]
pub fn session_at(hours: &MarketHours, ts: DateTime<Utc>) -> MarketSession {
    let local = ts.with_timezone(&hours.timezone);
    if !is_trading_day(local.date_naive()) {
        return MarketSession::Closed;
    }
    let t = local.time();
    if t < hours.pre_market_open || t >= hours.after_hours_close {
        MarketSession::Closed
    } else if t < hours.regular_open {
        MarketSession::PreMarket
    } else if t < hours.regular_close {
        MarketSession::Regular
    } else {
        MarketSession::AfterHours
    }
}

/// Time between `from` and `to` that falls inside the extended session
/// (pre-market open to after-hours close) of a trading day.
///
/// Returns zero when `to <= from`.
#[must_use]
pub fn open_market_time(hours: &MarketHours, from: DateTime<Utc>, to: DateTime<Utc>) -> TimeDelta {
    if to <= from {
        return TimeDelta::zero();
    }
    let mut total = TimeDelta::zero();
    let mut day = local_date(hours, from);
    let last = local_date(hours, to);
    while day <= last {
        if is_trading_day(day) {
            let window = at_local(hours, day, hours.pre_market_open)
                .zip(at_local(hours, day, hours.after_hours_close));
            if let Some((open, close)) = window {
                let start = open.max(from);
                let end = close.min(to);
                if end > start {
                    total += end - start;
                }
            }
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    total
}

/// Number of trading days in `[from, to)`.
#[must_use]
pub fn trading_days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    from.iter_days()
        .take_while(|d| *d < to)
        .filter(|d| is_trading_day(*d))
        .fold(0, |n, _| n + 1)
}
