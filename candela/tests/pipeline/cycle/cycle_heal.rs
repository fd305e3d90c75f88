use crate::helpers::{
    AAPL, Harness, bars_between, bars_until, concat, friday, full_day, harness, harness_with, hm,
    in_session, through_now, today, utc,
};
use candela::{
    CandelaError, CoverageConfig, CycleState, FetchSize, HealOutcome, Interval, MarketHours,
    RawPayload, SeriesKey,
};
use candela_mock::{MockBehavior, fixtures};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Fresh data with a three-hour hole this morning (07:00 to 10:00).
fn gappy_today(symbol: &str) -> RawPayload {
    concat(vec![
        full_day(symbol, Interval::I5m, friday(), Decimal::from(100)),
        bars_until(symbol, Interval::I5m, today(), hm(7, 0), Decimal::from(110)),
        bars_between(
            symbol,
            Interval::I5m,
            today(),
            hm(10, 0),
            hm(11, 0),
            Decimal::from(120),
        ),
    ])
}

fn friday_only(symbol: &str) -> RawPayload {
    full_day(symbol, Interval::I5m, friday(), Decimal::from(100))
}

/// Minimal fetches with a store holding Friday plus this morning up to 07:00.
async fn seeded_through_seven(now: chrono::DateTime<chrono::Utc>) -> Harness {
    let h = harness_with(now, |b| {
        b.coverage(CoverageConfig {
            intraday_lookback_days: 3,
            intraday_min_bytes: 1024,
            ..CoverageConfig::default()
        })
    });
    let history = concat(vec![
        friday_only(AAPL),
        bars_until(AAPL, Interval::I5m, today(), hm(7, 0), Decimal::from(110)),
    ]);
    let (seed, _) = candela_core::standardize(&history, &MarketHours::default());
    h.store.insert(seed).await;
    h
}

fn ten_to_eleven(symbol: &str) -> RawPayload {
    bars_between(
        symbol,
        Interval::I5m,
        today(),
        hm(10, 0),
        hm(11, 0),
        Decimal::from(120),
    )
}

#[tokio::test(start_paused = true)]
async fn recent_gap_is_healed_by_full_refetch() {
    let h = seeded_through_seven(in_session()).await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Minimal, MockBehavior::Return(ten_to_eleven(AAPL)))
        .await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Return(through_now(AAPL)))
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done, "{report:?}");
    assert_eq!(report.decision, Some(FetchSize::Minimal));
    assert_eq!(report.gap_count, 1);
    assert_eq!(report.heal, HealOutcome::Healed { rows: 276 });
    assert_eq!(report.final_rows, 276);
    assert!(report.warnings.is_empty());
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Full).await, 1);

    let stored = h
        .store
        .get(&SeriesKey::new(AAPL, Interval::I5m))
        .await
        .unwrap();
    assert_eq!(stored.len(), 276);
}

#[tokio::test(start_paused = true)]
async fn stale_heal_result_keeps_the_merged_series() {
    let h = seeded_through_seven(in_session()).await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Minimal, MockBehavior::Return(ten_to_eleven(AAPL)))
        .await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Return(friday_only(AAPL)))
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done, "{report:?}");
    assert!(matches!(report.heal, HealOutcome::Failed { .. }));
    assert!(matches!(report.warnings[..], [CandelaError::Validation(_)]));

    let stored = h
        .store
        .get(&SeriesKey::new(AAPL, Interval::I5m))
        .await
        .unwrap();
    // Friday 192, this morning 36 before the hole and 12 after it.
    assert_eq!(stored.len(), 240);
    let last_local = stored
        .last()
        .unwrap()
        .ts
        .with_timezone(&MarketHours::default().timezone)
        .date_naive();
    assert_eq!(last_local, today());
}

#[tokio::test(start_paused = true)]
async fn hole_in_the_providers_own_chunk_is_not_refetched() {
    let h = harness(in_session());
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Return(gappy_today(AAPL)))
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done, "{report:?}");
    assert_eq!(report.gap_count, 1);
    assert_eq!(report.heal, HealOutcome::NotNeeded);
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Full).await, 1);
}

#[tokio::test(start_paused = true)]
async fn daily_holiday_in_compact_window_never_heals() {
    let labor_day = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let weekdays = |from: NaiveDate, to: NaiveDate| -> Vec<NaiveDate> {
        from.iter_days()
            .take_while(|d| *d <= to)
            .filter(|d| d.weekday().num_days_from_monday() < 5 && *d != labor_day)
            .collect()
    };
    let last = NaiveDate::from_ymd_opt(2024, 10, 11).unwrap();
    let history = fixtures::daily(
        AAPL,
        &weekdays(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), last),
        Decimal::from(180),
    );
    let compact = fixtures::daily(
        AAPL,
        &weekdays(NaiveDate::from_ymd_opt(2024, 8, 20).unwrap(), last),
        Decimal::from(220),
    );

    // Monday 2024-10-14, 11:00 New York.
    let h = harness(utc(2024, 10, 14, 15, 0));
    let (seed, _) = candela_core::standardize(&history, &MarketHours::default());
    let seeded_rows = seed.len();
    h.store.insert(seed).await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Minimal, MockBehavior::Return(compact))
        .await;

    for _ in 0..3 {
        let report = h.candela.run_cycle(AAPL, Interval::D1, false).await;
        assert_eq!(report.state, CycleState::Done, "{report:?}");
        assert_eq!(report.decision, Some(FetchSize::Minimal));
        assert_eq!(report.gap_count, 1);
        assert!(!report.stale);
        assert_eq!(report.heal, HealOutcome::NotNeeded);
        assert_eq!(report.final_rows, seeded_rows);
    }
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Full).await, 0);
}

#[tokio::test(start_paused = true)]
async fn stale_series_triggers_a_heal() {
    let h = harness(in_session());
    h.ctrl
        .push_behavior(AAPL, FetchSize::Full, MockBehavior::Return(friday_only(AAPL)))
        .await;
    h.ctrl
        .push_behavior(AAPL, FetchSize::Full, MockBehavior::Return(through_now(AAPL)))
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done);
    assert_eq!(report.gap_count, 0);
    assert!(!report.stale);
    assert_eq!(report.heal, HealOutcome::Healed { rows: 276 });
}

#[tokio::test(start_paused = true)]
async fn failed_heal_fetch_is_a_warning() {
    let h = harness(in_session());
    h.ctrl
        .push_behavior(AAPL, FetchSize::Full, MockBehavior::Return(friday_only(AAPL)))
        .await;
    h.ctrl
        .push_behavior(
            AAPL,
            FetchSize::Full,
            MockBehavior::Fail(CandelaError::provider("mock", "invalid API call")),
        )
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done);
    assert!(report.stale);
    assert!(matches!(report.heal, HealOutcome::Failed { .. }));
    assert!(matches!(report.warnings[..], [CandelaError::Provider { .. }]));
    assert_eq!(report.final_rows, 192);
}

#[tokio::test(start_paused = true)]
async fn empty_heal_payload_is_rejected() {
    let h = harness(in_session());
    h.ctrl
        .push_behavior(AAPL, FetchSize::Full, MockBehavior::Return(friday_only(AAPL)))
        .await;
    h.ctrl
        .push_behavior(
            AAPL,
            FetchSize::Full,
            MockBehavior::Return(RawPayload::empty(AAPL, Interval::I5m)),
        )
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done);
    match &report.heal {
        HealOutcome::Failed { reason } => assert!(reason.contains("no usable candles"), "{reason}"),
        other => panic!("expected failed heal, got {other:?}"),
    }
    assert_eq!(report.final_rows, 192);
}

#[tokio::test(start_paused = true)]
async fn historical_gap_is_counted_but_not_healed() {
    let h = harness_with(in_session(), |b| {
        b.coverage(CoverageConfig {
            intraday_lookback_days: 3,
            intraday_min_bytes: 1024,
            ..CoverageConfig::default()
        })
    });
    // Thursday has a hole between 07:00 and 10:00 that a minimal fetch cannot reach.
    let thursday = NaiveDate::from_ymd_opt(2024, 8, 8).unwrap();
    let history = concat(vec![
        bars_until(AAPL, Interval::I5m, thursday, hm(7, 0), Decimal::from(90)),
        bars_between(
            AAPL,
            Interval::I5m,
            thursday,
            hm(10, 0),
            hm(20, 0),
            Decimal::from(95),
        ),
        friday_only(AAPL),
    ]);
    let (seed, _) = candela_core::standardize(&history, &MarketHours::default());
    h.store.insert(seed).await;

    h.ctrl
        .set_behavior(
            AAPL,
            FetchSize::Minimal,
            MockBehavior::Return(bars_until(
                AAPL,
                Interval::I5m,
                today(),
                hm(11, 0),
                Decimal::from(110),
            )),
        )
        .await;

    let report = h.candela.run_cycle(AAPL, Interval::I5m, false).await;
    assert_eq!(report.state, CycleState::Done, "{report:?}");
    assert_eq!(report.decision, Some(FetchSize::Minimal));
    assert_eq!(report.gap_count, 1);
    assert_eq!(report.heal, HealOutcome::NotNeeded);
    assert_eq!(report.rows_appended, 84);
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Full).await, 0);
}
