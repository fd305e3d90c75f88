#![doc = include_str!("../README.md")]
//! candela-middleware
//!
//! Re-exports for the rate limiter and tiered cache.

mod cache;
mod rate_limit;

pub use crate::cache::{CacheEntry, CacheStats, TieredCache, cache_key};
pub use crate::rate_limit::RateLimiter;
