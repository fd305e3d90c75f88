//! Shared provider throttle with adaptive backoff.
//!
//! One [`RateLimiter`] is owned by the orchestrator and shared by every worker.
//! Calls are spaced by `60 / calls_per_minute * backoff_factor` seconds.
//! Concurrent acquirers reserve distinct slots, so the lock is never held
//! across the wait.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use candela_types::{RateLimitConfig, RateLimiterState};
use tokio::time::Instant;

const SUCCESS_DECAY: f64 = 0.9;
const RATE_LIMIT_GROWTH: f64 = 2.0;

/// Throttles outbound provider calls to a configured quota.
#[derive(Debug)]
pub struct RateLimiter {
    base_interval: Duration,
    max_backoff_factor: f64,
    runtime: Mutex<LimiterRuntime>,
}

#[derive(Debug)]
struct LimiterRuntime {
    last_slot: Option<Instant>,
    backoff_factor: f64,
    calls_granted: u64,
}

impl LimiterRuntime {
    fn interval(&self, base: Duration) -> Duration {
        base.mul_f64(self.backoff_factor)
    }
}

impl RateLimiter {
    /// Build a limiter from its configuration. A zero rate is treated as one call per minute.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let per_minute = config.calls_per_minute.max(1);
        Self {
            base_interval: Duration::from_secs(60) / per_minute,
            max_backoff_factor: config.max_backoff_factor.max(1.0),
            runtime: Mutex::new(LimiterRuntime {
                last_slot: None,
                backoff_factor: 1.0,
                calls_granted: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LimiterRuntime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spacing currently enforced between calls.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.lock().interval(self.base_interval)
    }

    /// Wait until a call slot is available.
    ///
    /// The slot is reserved before waiting; N back-to-back acquisitions take
    /// at least `(N - 1) * min_interval`.
    pub async fn acquire(&self) {
        let slot = {
            let mut rt = self.lock();
            let now = Instant::now();
            let interval = rt.interval(self.base_interval);
            let slot = rt
                .last_slot
                .map_or(now, |last| (last + interval).max(now));
            rt.last_slot = Some(slot);
            rt.calls_granted += 1;
            slot
        };
        let now = Instant::now();
        if slot > now {
            tracing::debug!(wait_ms = (slot - now).as_millis(), "rate limiter waiting");
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Relax the backoff factor after a successful call (floor 1).
    pub fn on_success(&self) {
        let mut rt = self.lock();
        rt.backoff_factor = (rt.backoff_factor * SUCCESS_DECAY).max(1.0);
    }

    /// Double the backoff factor after a provider rate-limit signal (capped).
    pub fn on_rate_limit(&self) {
        let mut rt = self.lock();
        rt.backoff_factor = (rt.backoff_factor * RATE_LIMIT_GROWTH).min(self.max_backoff_factor);
        let factor = rt.backoff_factor;
        drop(rt);
        tracing::warn!(backoff_factor = factor, "provider rate limit hit; backing off");
    }

    /// Current backoff factor.
    #[must_use]
    pub fn backoff_factor(&self) -> f64 {
        self.lock().backoff_factor
    }

    /// Point-in-time view of the limiter.
    #[must_use]
    pub fn snapshot(&self) -> RateLimiterState {
        let rt = self.lock();
        RateLimiterState {
            calls_granted: rt.calls_granted,
            backoff_factor: rt.backoff_factor,
            min_interval: rt.interval(self.base_interval),
        }
    }
}
