//! Candle, series, and request types shared by the pipeline stages.

use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use candela_types::*;

/// One OHLCV bar.
///
/// The symbol lives on the owning [`Series`]. `ts` is the canonical UTC
/// instant produced by the standardizer (minute-aligned for intraday, the
/// market-close instant for daily).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar timestamp in UTC.
    pub ts: DateTime<Utc>,
    /// Opening price.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Closing (or latest) price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: u64,
}

/// Identity of a persisted series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Ticker symbol, upper-case.
    pub symbol: String,
    /// Candle interval.
    pub interval: Interval,
}

impl SeriesKey {
    /// Build a key; the symbol is trimmed and upper-cased.
    pub fn new(symbol: impl AsRef<str>, interval: Interval) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_ascii_uppercase(),
            interval,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

/// Ordered candles for one symbol and interval.
///
/// Timestamps are strictly increasing. Every constructor sorts its input and
/// collapses duplicate timestamps, keeping the last occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SeriesRepr")]
pub struct Series {
    key: SeriesKey,
    candles: Vec<Candle>,
}

#[derive(Deserialize)]
struct SeriesRepr {
    key: SeriesKey,
    candles: Vec<Candle>,
}

impl From<SeriesRepr> for Series {
    fn from(r: SeriesRepr) -> Self {
        Self::from_candles(r.key, r.candles)
    }
}

impl Series {
    /// Empty series for `key`.
    #[must_use]
    pub const fn empty(key: SeriesKey) -> Self {
        Self {
            key,
            candles: Vec::new(),
        }
    }

    /// Build a series from candles in any order.
    #[must_use]
    pub fn from_candles(key: SeriesKey, mut candles: Vec<Candle>) -> Self {
        // Stable sort keeps arrival order among equal timestamps, so the
        // dedup below can retain the last one.
        candles.sort_by_key(|c| c.ts);
        let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
        for c in candles {
            match out.last_mut() {
                Some(prev) if prev.ts == c.ts => *prev = c,
                _ => out.push(c),
            }
        }
        Self { key, candles: out }
    }

    /// Caller guarantees strict ascending order.
    pub(crate) const fn from_sorted(key: SeriesKey, candles: Vec<Candle>) -> Self {
        Self { key, candles }
    }

    /// Series identity.
    #[must_use]
    pub const fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Ticker symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.key.symbol
    }

    /// Candle interval.
    #[must_use]
    pub const fn interval(&self) -> Interval {
        self.key.interval
    }

    /// Candles in ascending timestamp order.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Consume the series, returning its candles.
    #[must_use]
    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    /// Number of candles.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.candles.len()
    }

    /// True when there are no candles.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Earliest candle.
    #[must_use]
    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    /// Most recent candle.
    #[must_use]
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

/// One provider row before standardization.
///
/// `timestamp` is whatever the provider sent: naive exchange-local time, a
/// bare date, or an explicit-offset string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandle {
    /// Raw timestamp text.
    pub timestamp: String,
    /// Opening price.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: u64,
}

/// Provider output consumed by the standardizer; cached as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayload {
    /// Symbol the rows belong to.
    pub symbol: String,
    /// Interval of the rows.
    pub interval: Interval,
    /// Rows in provider order.
    pub rows: Vec<RawCandle>,
}

impl RawPayload {
    /// Empty payload for `symbol`/`interval`.
    #[must_use]
    pub fn empty(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            rows: Vec::new(),
        }
    }
}

/// A single fetch to be issued by the fetch client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Ticker symbol.
    pub symbol: String,
    /// Candle interval.
    pub interval: Interval,
    /// How much history to ask for.
    pub size: FetchSize,
    /// Regular update or corrective heal.
    pub mode: FetchMode,
}

impl FetchRequest {
    /// Regular-mode request.
    pub fn new(symbol: impl Into<String>, interval: Interval, size: FetchSize) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            size,
            mode: FetchMode::Regular,
        }
    }

    /// Full fetch in heal mode.
    pub fn heal(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            size: FetchSize::Full,
            mode: FetchMode::Heal,
        }
    }
}

/// A series as returned by storage, with the stored size used by the fetch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSeries {
    /// Persisted candles.
    pub series: Series,
    /// Size of the persisted representation in bytes.
    pub size_bytes: u64,
}
