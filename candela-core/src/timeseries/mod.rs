//! Time-series stages of the ingestion cycle.
//!
//! - `standardize`: canonical UTC timestamps from raw provider rows
//! - `merge`: idempotent merge of new candles into an existing series
//! - `gaps`: discontinuity and freshness checks
//! - `retention`: trim a series to its configured window
//! - `coverage`: present/expected ratio used by the fetch-size decision
/// Coverage ratio over a lookback window.
pub mod coverage;
/// Gap and freshness detection.
pub mod gaps;
/// Idempotent series merge.
pub mod merge;
/// Retention trimming.
pub mod retention;
/// Timestamp standardization.
pub mod standardize;
