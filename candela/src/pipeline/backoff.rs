use std::time::Duration;

use candela_types::RetryConfig;
use rand::Rng;

/// Add up to `jitter_percent` of `base_ms` as random jitter.
pub fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    };
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

/// Delay before retrying after failed attempt number `attempt` (1-based).
///
/// `base * 2^(attempt-1)`, stretched by the rate-limit multiplier when the
/// provider signalled throttling, capped at `max_backoff_ms`, then jittered.
pub fn retry_delay(cfg: &RetryConfig, attempt: u32, rate_limited: bool) -> Duration {
    let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
    let mut ms = cfg.base_backoff_ms.saturating_mul(exp);
    if rate_limited {
        ms = ms.saturating_mul(u64::from(cfg.rate_limited_multiplier.max(1)));
    }
    let capped = ms.min(cfg.max_backoff_ms);
    Duration::from_millis(jitter_wait(capped, u32::from(cfg.jitter_percent)))
}
