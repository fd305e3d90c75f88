//! Timestamp canonicalization and payload standardization.
//!
//! Every timestamp leaving this module is a UTC instant rendered as
//! `YYYY-MM-DD HH:MM:SS+00:00`. Naive provider values are read as exchange
//! local time; daily values are anchored to the regular-session close of
//! their exchange-local date.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::market::{at_local, local_date};
use crate::{Candle, CandelaError, DataClass, MarketHours, RawPayload, Series, SeriesKey};

/// Canonical rendering format.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S+00:00";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

/// Counters produced by [`standardize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizeStats {
    /// Rows kept.
    pub parsed: usize,
    /// Rows dropped because the timestamp was unparsable or skipped by DST.
    pub dropped_timestamps: usize,
    /// Rows dropped because a price was zero or negative.
    pub dropped_prices: usize,
}

impl StandardizeStats {
    /// Total rows dropped.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped_timestamps + self.dropped_prices
    }
}

enum Parsed {
    Naive(NaiveDateTime),
    Date(NaiveDate),
    Zoned(DateTime<FixedOffset>),
}

fn parse_raw(raw: &str) -> Option<Parsed> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Parsed::Zoned(dt));
    }
    for f in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(Parsed::Zoned(dt));
        }
    }
    for f in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(Parsed::Naive(dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Parsed::Date)
}

/// Canonicalize one raw timestamp.
///
/// Returns `None` for unparsable values and for naive local times that do not
/// exist in the exchange timezone. Ambiguous local times resolve to the
/// earliest instant. Intraday values are floored to the minute.
#[must_use]
pub fn standardize_timestamp(
    raw: &str,
    class: DataClass,
    hours: &MarketHours,
) -> Option<DateTime<Utc>> {
    let parsed = parse_raw(raw)?;
    match class {
        DataClass::Daily => {
            let date = match parsed {
                Parsed::Naive(dt) => dt.date(),
                Parsed::Date(d) => d,
                Parsed::Zoned(dt) => local_date(hours, dt.with_timezone(&Utc)),
            };
            at_local(hours, date, hours.regular_close)
        }
        DataClass::Intraday => {
            let utc = match parsed {
                Parsed::Naive(dt) => hours
                    .timezone
                    .from_local_datetime(&dt)
                    .earliest()?
                    .with_timezone(&Utc),
                Parsed::Date(d) => hours
                    .timezone
                    .from_local_datetime(&d.and_time(chrono::NaiveTime::MIN))
                    .earliest()?
                    .with_timezone(&Utc),
                Parsed::Zoned(dt) => dt.with_timezone(&Utc),
            };
            utc.with_second(0).and_then(|t| t.with_nanosecond(0))
        }
    }
}

/// Render a UTC instant in canonical form.
#[must_use]
pub fn render_utc(ts: DateTime<Utc>) -> String {
    ts.format(CANONICAL_FORMAT).to_string()
}

/// Parse a canonically rendered timestamp.
///
/// # Errors
/// Returns `Validation` when `s` lacks the explicit `+00:00` offset or does
/// not parse.
pub fn parse_canonical(s: &str) -> Result<DateTime<Utc>, CandelaError> {
    if !s.ends_with("+00:00") {
        return Err(CandelaError::Validation(format!(
            "timestamp '{s}' lacks an explicit +00:00 offset"
        )));
    }
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CandelaError::Validation(format!("timestamp '{s}': {e}")))
}

fn positive(p: Decimal) -> bool {
    p > Decimal::ZERO
}

/// Standardize a provider payload into a series.
///
/// Rows with unusable timestamps or non-positive prices are dropped and
/// counted. Duplicate timestamps keep the last row.
#[must_use]
pub fn standardize(payload: &RawPayload, hours: &MarketHours) -> (Series, StandardizeStats) {
    let class = payload.interval.data_class();
    let mut stats = StandardizeStats::default();
    let mut candles = Vec::with_capacity(payload.rows.len());

    for row in &payload.rows {
        let Some(ts) = standardize_timestamp(&row.timestamp, class, hours) else {
            stats.dropped_timestamps += 1;
            continue;
        };
        if ![row.open, row.high, row.low, row.close]
            .into_iter()
            .all(positive)
        {
            stats.dropped_prices += 1;
            continue;
        }
        candles.push(Candle {
            ts,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    stats.parsed = candles.len();
    if stats.dropped() > 0 {
        debug!(
            symbol = %payload.symbol,
            interval = %payload.interval,
            dropped_timestamps = stats.dropped_timestamps,
            dropped_prices = stats.dropped_prices,
            "standardize dropped rows"
        );
    }

    let key = SeriesKey::new(&payload.symbol, payload.interval);
    (Series::from_candles(key, candles), stats)
}

/// Check that every timestamp of `series` is canonical.
///
/// # Errors
/// Returns `Validation` on the first timestamp that does not round-trip through
/// the canonical rendering, is not minute-aligned (intraday), or breaks strict
/// ascending order.
pub fn validate(series: &Series) -> Result<(), CandelaError> {
    let intraday = series.interval().is_intraday();
    let mut prev: Option<DateTime<Utc>> = None;
    for c in series.candles() {
        let rendered = render_utc(c.ts);
        if parse_canonical(&rendered)? != c.ts {
            return Err(CandelaError::Validation(format!(
                "timestamp {rendered} does not round-trip"
            )));
        }
        if intraday && (c.ts.second() != 0 || c.ts.nanosecond() != 0) {
            return Err(CandelaError::Validation(format!(
                "intraday timestamp {rendered} is not minute-aligned"
            )));
        }
        if prev.is_some_and(|p| p >= c.ts) {
            return Err(CandelaError::Validation(format!(
                "timestamp {rendered} is out of order"
            )));
        }
        prev = Some(c.ts);
    }
    Ok(())
}

/// Validate a column of rendered timestamps.
///
/// # Errors
/// Returns `Validation` when a value lacks the explicit offset, does not parse,
/// is not minute-aligned for intraday data, or breaks strict ascending order.
pub fn validate_rendered(values: &[String], class: DataClass) -> Result<(), CandelaError> {
    let mut prev: Option<DateTime<Utc>> = None;
    for v in values {
        let ts = parse_canonical(v)?;
        if class == DataClass::Intraday && ts.second() != 0 {
            return Err(CandelaError::Validation(format!(
                "intraday timestamp {v} is not minute-aligned"
            )));
        }
        if prev.is_some_and(|p| p >= ts) {
            return Err(CandelaError::Validation(format!(
                "timestamp {v} is out of order"
            )));
        }
        prev = Some(ts);
    }
    Ok(())
}
