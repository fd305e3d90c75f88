//! Interval, data class, and fetch request primitives.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::CandelaError;

/// Candle interval of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Interval {
    /// One-minute candles.
    #[serde(rename = "1min")]
    I1m,
    /// Five-minute candles.
    #[serde(rename = "5min")]
    I5m,
    /// Fifteen-minute candles.
    #[serde(rename = "15min")]
    I15m,
    /// Thirty-minute candles.
    #[serde(rename = "30min")]
    I30m,
    /// Sixty-minute candles.
    #[serde(rename = "60min")]
    I60m,
    /// One candle per trading day.
    #[serde(rename = "daily")]
    D1,
}

impl Interval {
    /// Every interval the engine knows about, shortest first.
    pub const ALL: &'static [Self] = &[
        Self::I1m,
        Self::I5m,
        Self::I15m,
        Self::I30m,
        Self::I60m,
        Self::D1,
    ];

    /// Provider-facing label (`"1min"`, ..., `"daily"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::I1m => "1min",
            Self::I5m => "5min",
            Self::I15m => "15min",
            Self::I30m => "30min",
            Self::I60m => "60min",
            Self::D1 => "daily",
        }
    }

    /// Bar length in minutes for intraday intervals; `None` for daily.
    #[must_use]
    pub const fn minutes(self) -> Option<u32> {
        match self {
            Self::I1m => Some(1),
            Self::I5m => Some(5),
            Self::I15m => Some(15),
            Self::I30m => Some(30),
            Self::I60m => Some(60),
            Self::D1 => None,
        }
    }

    /// Data class used by standardization, retention, and coverage rules.
    #[must_use]
    pub const fn data_class(self) -> DataClass {
        match self {
            Self::D1 => DataClass::Daily,
            _ => DataClass::Intraday,
        }
    }

    /// Convenience: `data_class() == DataClass::Intraday`.
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        matches!(self.data_class(), DataClass::Intraday)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = CandelaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == norm)
            .or(match norm.as_str() {
                "1m" => Some(Self::I1m),
                "5m" => Some(Self::I5m),
                "15m" => Some(Self::I15m),
                "30m" => Some(Self::I30m),
                "60m" | "1h" => Some(Self::I60m),
                "1d" | "d1" => Some(Self::D1),
                _ => None,
            })
            .ok_or_else(|| CandelaError::InvalidArg(format!("unknown interval '{s}'")))
    }
}

/// Coarse class of a series, driving timestamp anchoring and retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClass {
    /// Minute-resolution bars.
    Intraday,
    /// One bar per exchange day.
    Daily,
}

/// How much history a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSize {
    /// Recent short window; cheap and quota-friendly.
    Minimal,
    /// Whole retained history; reserved for rebuilds and repairs.
    Full,
}

impl FetchSize {
    /// Provider-facing label (`"compact"` or `"full"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "compact",
            Self::Full => "full",
        }
    }

    /// Capability a provider must advertise to serve this size.
    #[must_use]
    pub const fn capability(self) -> Capability {
        match self {
            Self::Minimal => Capability::FetchMinimal,
            Self::Full => Capability::FetchFull,
        }
    }
}

impl fmt::Display for FetchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Scheduled update; cached results may be served.
    #[default]
    Regular,
    /// Corrective full fetch after a gap or staleness signal; always hits the provider.
    Heal,
}
