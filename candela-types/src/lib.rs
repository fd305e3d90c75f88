//! Candela primitives: intervals, fetch sizes, configuration, errors, and cycle reports.
#![warn(missing_docs)]

mod capability;
mod config;
mod error;
mod interval;
mod reports;

pub use capability::Capability;
pub use config::{
    CacheConfig, CandelaConfig, CoverageConfig, FreshnessConfig, GapConfig, MarketHours,
    RateLimitConfig, RateLimiterState, RetentionConfig, RetentionWindow, RetryConfig,
};
pub use error::CandelaError;
pub use interval::{DataClass, FetchMode, FetchSize, Interval};
pub use reports::{BatchReport, CycleReport, CycleState, HealOutcome};
