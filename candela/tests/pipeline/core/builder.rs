use std::sync::Arc;
use std::time::Duration;

use candela::{Candela, CandelaConfig, CandelaError};
use candela_mock::{DynamicMockProvider, MemoryStore};

#[test]
fn build_requires_a_provider() {
    let err = Candela::builder()
        .with_store(Arc::new(MemoryStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn build_requires_a_store() {
    let (provider, _ctrl) = DynamicMockProvider::new_with_controller("mock");
    let err = Candela::builder()
        .with_provider(provider)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn build_rejects_invalid_config() {
    let (provider, _ctrl) = DynamicMockProvider::new_with_controller("mock");
    let err = Candela::builder()
        .with_provider(provider)
        .with_store(Arc::new(MemoryStore::new()))
        .concurrency(0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CandelaError::Config(_)));
}

#[tokio::test]
async fn json_config_then_setters() {
    let cfg = CandelaConfig::from_json_str(
        r#"{ "concurrency": 2, "rate_limit": { "calls_per_minute": 75 } }"#,
    )
    .unwrap();
    let (provider, _ctrl) = DynamicMockProvider::new_with_controller("mock");
    let candela = Candela::builder()
        .with_provider(provider)
        .with_store(Arc::new(MemoryStore::new()))
        .config(cfg)
        .provider_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    assert_eq!(candela.config().concurrency, 2);
    assert_eq!(candela.config().provider_timeout, Duration::from_secs(5));
    assert_eq!(
        candela.limiter_state().min_interval,
        Duration::from_millis(800)
    );
    assert_eq!(candela.fetcher().provider_name(), "mock");
}

#[test]
fn init_tracing_is_idempotent() {
    candela::init_tracing();
    candela::init_tracing();
    tracing::info!(target: "candela::cycle", "still logging");
}
