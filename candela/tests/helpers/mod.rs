// Shared harness so tests can `use helpers::*;`
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use candela::{Candela, CandelaBuilder, Interval, RateLimitConfig, RawPayload, RetryConfig};
use candela_mock::{
    DynamicMockController, DynamicMockProvider, FixedClock, MemoryStore, fixtures,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;

/// Common symbol constants used across tests.
pub const AAPL: &str = "AAPL";
pub const MSFT: &str = "MSFT";
pub const TSLA: &str = "TSLA";
pub const BAD: &str = "BAD";

/// Monday 2024-08-12, a regular trading day.
pub const fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, 12).expect("valid date")
}

/// Friday 2024-08-09, the trading day before [`today`].
pub const fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, 9).expect("valid date")
}

/// Construct a UTC `DateTime` from components for readability in tests.
pub fn utc(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
}

/// 11:00 New York time on [`today`], inside the regular session (EDT, UTC-4).
pub fn in_session() -> DateTime<Utc> {
    utc(2024, 8, 12, 15, 0)
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Bars of `interval` from 04:00 up to (excluding) `until` on `day`, exchange-local.
pub fn bars_until(
    symbol: &str,
    interval: Interval,
    day: NaiveDate,
    until: NaiveTime,
    base: Decimal,
) -> RawPayload {
    bars_between(symbol, interval, day, hm(4, 0), until, base)
}

/// Bars of `interval` in `[from, until)` on `day`, exchange-local.
pub fn bars_between(
    symbol: &str,
    interval: Interval,
    day: NaiveDate,
    from: NaiveTime,
    until: NaiveTime,
    base: Decimal,
) -> RawPayload {
    let step = i64::from(interval.minutes().unwrap());
    let count = usize::try_from((until - from).num_minutes() / step).unwrap();
    fixtures::intraday(symbol, interval, day.and_time(from), count, base)
}

/// A whole extended session (04:00 to 20:00) on `day`.
pub fn full_day(symbol: &str, interval: Interval, day: NaiveDate, base: Decimal) -> RawPayload {
    bars_until(symbol, interval, day, hm(20, 0), base)
}

/// Concatenate payloads for the same symbol and interval.
pub fn concat(parts: Vec<RawPayload>) -> RawPayload {
    let mut it = parts.into_iter();
    let mut out = it.next().expect("at least one payload");
    for p in it {
        out.rows.extend(p.rows);
    }
    out
}

/// Friday's full extended session plus today's bars up to 11:00 (5-minute bars).
pub fn through_now(symbol: &str) -> RawPayload {
    concat(vec![
        full_day(symbol, Interval::I5m, friday(), Decimal::from(100)),
        bars_until(symbol, Interval::I5m, today(), hm(11, 0), Decimal::from(110)),
    ])
}

/// Everything a test needs to drive an orchestrator.
pub struct Harness {
    pub candela: Candela,
    pub ctrl: DynamicMockController,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
}

/// Fast retry and rate-limit settings so paused-clock tests stay short.
pub fn fast_builder() -> CandelaBuilder {
    Candela::builder()
        .rate_limit(RateLimitConfig {
            calls_per_minute: 60_000,
            max_backoff_factor: 10.0,
        })
        .retry(RetryConfig {
            attempts: 3,
            base_backoff_ms: 10,
            max_backoff_ms: 100,
            rate_limited_multiplier: 4,
            jitter_percent: 0,
        })
        .provider_timeout(Duration::from_secs(1))
}

pub fn harness(now: DateTime<Utc>) -> Harness {
    harness_with(now, |b| b)
}

pub fn harness_with(
    now: DateTime<Utc>,
    tweak: impl FnOnce(CandelaBuilder) -> CandelaBuilder,
) -> Harness {
    let (provider, ctrl) = DynamicMockProvider::new_with_controller("mock");
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(now));
    let builder = fast_builder()
        .with_provider(provider)
        .with_store(store.clone())
        .with_clock(clock.clone());
    let candela = tweak(builder).build().unwrap();
    Harness {
        candela,
        ctrl,
        store,
        clock,
    }
}
