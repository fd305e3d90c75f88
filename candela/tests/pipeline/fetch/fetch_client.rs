use std::time::Duration;

use crate::helpers::{AAPL, BAD, MSFT, TSLA, harness, harness_with, in_session, through_now};
use candela::{CacheConfig, CandelaError, FetchOutcome, FetchRequest, FetchSize, Interval};
use candela_mock::MockBehavior;

#[tokio::test(start_paused = true)]
async fn regular_fetch_is_served_from_cache() {
    let h = harness(in_session());
    h.ctrl
        .set_behavior(AAPL, FetchSize::Minimal, MockBehavior::Return(through_now(AAPL)))
        .await;

    let req = FetchRequest::new(AAPL, Interval::I5m, FetchSize::Minimal);
    let first = h.candela.fetcher().fetch(req.clone()).await;
    assert!(first.is_success());
    assert!(!first.from_cache);
    assert_eq!(first.attempts, 1);
    assert_eq!(first.chunk().map(|p| p.rows.len()), Some(276));

    let second = h.candela.fetcher().fetch(req).await;
    assert!(second.is_success());
    assert!(second.from_cache);
    assert_eq!(second.attempts, 0);
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Minimal).await, 1);
    assert_eq!(h.candela.cache_stats().hits, 1);
}

#[tokio::test(start_paused = true)]
async fn heal_fetch_bypasses_cache() {
    let h = harness(in_session());
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Return(through_now(AAPL)))
        .await;

    let regular = h
        .candela
        .fetcher()
        .fetch(FetchRequest::new(AAPL, Interval::I5m, FetchSize::Full))
        .await;
    assert!(regular.is_success());

    let heal = h
        .candela
        .fetcher()
        .fetch(FetchRequest::heal(AAPL, Interval::I5m))
        .await;
    assert!(heal.is_success());
    assert!(!heal.from_cache);
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Full).await, 2);
}

#[tokio::test(start_paused = true)]
async fn zero_ttl_disables_caching() {
    let h = harness_with(in_session(), |b| {
        b.cache(CacheConfig {
            default_ttl: Duration::ZERO,
            ..CacheConfig::default()
        })
    });
    h.ctrl
        .set_behavior(AAPL, FetchSize::Minimal, MockBehavior::Return(through_now(AAPL)))
        .await;

    let req = FetchRequest::new(AAPL, Interval::I5m, FetchSize::Minimal);
    let _ = h.candela.fetcher().fetch(req.clone()).await;
    let again = h.candela.fetcher().fetch(req).await;
    assert!(!again.from_cache);
    assert_eq!(h.ctrl.call_count(AAPL, FetchSize::Minimal).await, 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_as_an_attempt() {
    let h = harness(in_session());
    h.ctrl
        .push_behavior(AAPL, FetchSize::Full, MockBehavior::Hang)
        .await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Return(through_now(AAPL)))
        .await;

    let result = h
        .candela
        .fetcher()
        .fetch(FetchRequest::new(AAPL, Interval::I5m, FetchSize::Full))
        .await;
    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn hanging_provider_ends_in_soft_timeout() {
    let h = harness(in_session());
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Hang)
        .await;

    let result = h
        .candela
        .fetcher()
        .fetch(FetchRequest::new(AAPL, Interval::I5m, FetchSize::Full))
        .await;
    assert_eq!(result.attempts, 3);
    assert!(matches!(
        result.outcome,
        FetchOutcome::SoftError(CandelaError::ProviderTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_signal_widens_limiter_and_retries() {
    let h = harness(in_session());
    h.ctrl
        .push_behavior(
            AAPL,
            FetchSize::Full,
            MockBehavior::Fail(CandelaError::rate_limited("mock", "5 calls per minute")),
        )
        .await;
    h.ctrl
        .set_behavior(AAPL, FetchSize::Full, MockBehavior::Return(through_now(AAPL)))
        .await;

    let before = tokio::time::Instant::now();
    let result = h
        .candela
        .fetcher()
        .fetch(FetchRequest::new(AAPL, Interval::I5m, FetchSize::Full))
        .await;
    assert!(result.is_success());
    assert_eq!(result.attempts, 2);
    // base 10ms * rate-limit multiplier 4
    assert!(before.elapsed() >= Duration::from_millis(40));

    let state = h.candela.limiter_state();
    assert_eq!(state.calls_granted, 2);
    assert!((state.backoff_factor - 1.8).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_are_soft_errors() {
    let h = harness(in_session());
    h.ctrl
        .set_behavior(
            AAPL,
            FetchSize::Minimal,
            MockBehavior::Fail(CandelaError::network("mock", "connection reset")),
        )
        .await;

    let result = h
        .candela
        .fetcher()
        .fetch(FetchRequest::new(AAPL, Interval::I5m, FetchSize::Minimal))
        .await;
    assert_eq!(result.attempts, 3);
    assert!(matches!(
        result.outcome,
        FetchOutcome::SoftError(CandelaError::Network { .. })
    ));
    assert!(result.chunk().is_none());
    assert!(result.into_result().is_err());
}

#[tokio::test(start_paused = true)]
async fn fetch_many_isolates_failures() {
    let h = harness(in_session());
    for sym in [AAPL, MSFT, TSLA] {
        h.ctrl
            .set_behavior(sym, FetchSize::Minimal, MockBehavior::Return(through_now(sym)))
            .await;
    }
    h.ctrl
        .set_behavior(
            BAD,
            FetchSize::Minimal,
            MockBehavior::Fail(CandelaError::provider("mock", "unknown symbol")),
        )
        .await;

    let symbols: Vec<String> = [AAPL, BAD, MSFT, TSLA]
        .iter()
        .map(ToString::to_string)
        .collect();
    let results = h
        .candela
        .fetcher()
        .fetch_many(&symbols, Interval::I5m, FetchSize::Minimal, 2)
        .await;

    assert_eq!(results.len(), 4);
    assert!(results[AAPL].is_success());
    assert!(results[MSFT].is_success());
    assert!(results[TSLA].is_success());
    assert!(matches!(
        results[BAD].outcome,
        FetchOutcome::HardError(CandelaError::Provider { .. })
    ));
}

#[tokio::test]
async fn disk_tier_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheConfig {
        dir: Some(dir.path().to_path_buf()),
        ..CacheConfig::default()
    };
    let req = FetchRequest::new(AAPL, Interval::I5m, FetchSize::Minimal);

    let first = harness_with(in_session(), |b| b.cache(cache.clone()));
    first
        .ctrl
        .set_behavior(AAPL, FetchSize::Minimal, MockBehavior::Return(through_now(AAPL)))
        .await;
    assert!(first.candela.fetcher().fetch(req.clone()).await.is_success());
    drop(first);

    let second = harness_with(in_session(), |b| b.cache(cache));
    let result = second.candela.fetcher().fetch(req).await;
    assert!(result.from_cache, "{result:?}");
    assert!(second.ctrl.calls().await.is_empty());
    assert_eq!(second.candela.cache_stats().disk_hits, 1);
}
