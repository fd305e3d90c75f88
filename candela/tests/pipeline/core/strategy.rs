use candela::{
    CoverageConfig, FetchSize, FetchStrategyDecider, Interval, MarketHours, SeriesKey,
    StoredSeries,
};
use candela_mock::fixtures;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

use crate::helpers::{AAPL, in_session};

fn decider() -> FetchStrategyDecider {
    FetchStrategyDecider::new(CoverageConfig::default(), MarketHours::default())
}

fn weekdays(days: &[u32]) -> Vec<NaiveDate> {
    days.iter()
        .map(|d| NaiveDate::from_ymd_opt(2024, 8, *d).unwrap())
        .collect()
}

// Regular-session 5-minute bars on the given August 2024 days.
fn stored(days: &[u32], size_bytes: u64) -> StoredSeries {
    let payload = fixtures::regular_sessions(AAPL, Interval::I5m, &weekdays(days), dec!(100));
    let (series, _) = candela_core::standardize(&payload, &MarketHours::default());
    StoredSeries { series, size_bytes }
}

fn key() -> SeriesKey {
    SeriesKey::new(AAPL, Interval::I5m)
}

#[test]
fn forced_full_wins() {
    let s = stored(&[5, 6, 7, 8, 9], 1 << 20);
    assert_eq!(
        decider().decide(&key(), Some(&s), true, in_session()),
        FetchSize::Full
    );
}

#[test]
fn nothing_stored_means_full() {
    assert_eq!(
        decider().decide(&key(), None, false, in_session()),
        FetchSize::Full
    );
}

#[test]
fn small_stored_payload_means_full() {
    let s = stored(&[5, 6, 7, 8, 9], 1_000);
    assert_eq!(
        decider().decide(&key(), Some(&s), false, in_session()),
        FetchSize::Full
    );
}

#[test]
fn complete_lookback_means_minimal() {
    // Monday 2024-08-12: the 7-day lookback holds Mon 5th through Fri 9th.
    let s = stored(&[5, 6, 7, 8, 9], 1 << 20);
    assert_eq!(
        decider().decide(&key(), Some(&s), false, in_session()),
        FetchSize::Minimal
    );
}

#[test]
fn missing_day_drops_coverage_below_threshold() {
    let s = stored(&[5, 6, 8, 9], 1 << 20);
    assert_eq!(
        decider().decide(&key(), Some(&s), false, in_session()),
        FetchSize::Full
    );
}

#[test]
fn daily_uses_its_own_thresholds() {
    let d = FetchStrategyDecider::new(
        CoverageConfig {
            daily_lookback_days: 7,
            ..CoverageConfig::default()
        },
        MarketHours::default(),
    );
    let payload = fixtures::daily(AAPL, &weekdays(&[5, 6, 7, 8, 9]), dec!(100));
    let (series, _) = candela_core::standardize(&payload, &MarketHours::default());
    let s = StoredSeries {
        series,
        size_bytes: 8 * 1024,
    };
    let daily_key = SeriesKey::new(AAPL, Interval::D1);
    assert_eq!(
        d.decide(&daily_key, Some(&s), false, in_session()),
        FetchSize::Minimal
    );
    let tiny = StoredSeries {
        size_bytes: 100,
        ..s
    };
    assert_eq!(
        d.decide(&daily_key, Some(&tiny), false, in_session()),
        FetchSize::Full
    );
}
