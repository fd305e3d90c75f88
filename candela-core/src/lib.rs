//! candela-core
//!
//! Core types, collaborator traits, and time-series stages shared across the
//! candela workspace.
//!
//! - `types`: candles, series, raw payloads, and fetch requests.
//! - `connector`: the `CandleConnector` trait and its capability traits.
//! - `store`: the `SeriesStore` persistence trait.
//! - `clock`: the `Clock` trait used for every "now".
//! - `market`: exchange sessions and trading-day arithmetic.
//! - `timeseries`: standardize, merge, gaps, retention, and coverage.
//!
#![warn(missing_docs)]

/// Clock abstraction.
pub mod clock;
/// Connector capability traits and the primary `CandleConnector` interface.
pub mod connector;
/// Exchange calendar helpers.
pub mod market;
/// Series persistence trait.
pub mod store;
/// Time-series pipeline stages.
pub mod timeseries;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use connector::{CandleConnector, FullProvider, MinimalProvider};
pub use market::MarketSession;
pub use store::SeriesStore;
pub use timeseries::gaps::{Gap, GapReport, check_freshness, detect_gaps};
pub use timeseries::merge::{MergeStats, merge, merge_with_stats};
pub use timeseries::retention::trim;
pub use timeseries::standardize::{
    StandardizeStats, render_utc, standardize, standardize_timestamp, validate, validate_rendered,
};
pub use types::*;
