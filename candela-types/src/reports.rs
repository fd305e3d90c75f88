//! Report envelopes produced by the ingestion cycle and batch runner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CandelaError;
use crate::interval::{FetchSize, Interval};

/// Per-symbol cycle state machine positions.
///
/// A cycle walks `Pending -> Deciding -> Fetching -> Standardizing -> Merging
/// -> GapChecking -> (Healing ->) Trimming -> Done`, or stops in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Not started.
    #[default]
    Pending,
    /// Choosing minimal vs. full fetch.
    Deciding,
    /// Waiting on the provider.
    Fetching,
    /// Normalizing timestamps and prices.
    Standardizing,
    /// Merging into the existing series.
    Merging,
    /// Looking for gaps and stale data.
    GapChecking,
    /// Running a corrective full fetch.
    Healing,
    /// Applying the retention window.
    Trimming,
    /// Series handed to storage.
    Done,
    /// Error surfaced; persisted state untouched.
    Failed,
}

impl CycleState {
    /// True for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Result of the optional heal step of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum HealOutcome {
    /// No gap or freshness problem was detected.
    #[default]
    NotNeeded,
    /// The series was replaced by a validated full fetch.
    Healed {
        /// Rows in the replacement series before trimming.
        rows: usize,
    },
    /// The heal fetch failed or did not validate; the prior series was kept.
    Failed {
        /// Why the replacement was rejected.
        reason: String,
    },
}

impl HealOutcome {
    /// True when a heal was attempted, successful or not.
    #[must_use]
    pub const fn was_triggered(&self) -> bool {
        !matches!(self, Self::NotNeeded)
    }
}

/// Summary of one symbol's ingestion cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Symbol processed.
    pub symbol: String,
    /// Interval processed.
    pub interval: Interval,
    /// Terminal state.
    pub state: CycleState,
    /// Fetch size chosen, when the cycle got that far.
    pub decision: Option<FetchSize>,
    /// Rows standardized from the provider payload.
    pub rows_fetched: usize,
    /// Raw rows dropped by standardization.
    pub rows_dropped: usize,
    /// Rows appended by the merge.
    pub rows_appended: usize,
    /// Rows updated in place by the merge.
    pub rows_updated: usize,
    /// Gaps found after the merge.
    pub gap_count: usize,
    /// Whether the merged series failed the freshness check.
    pub stale: bool,
    /// Heal step outcome.
    pub heal: HealOutcome,
    /// Rows in the series handed to storage (zero on failure).
    pub final_rows: usize,
    /// Wall-clock time spent in the cycle.
    pub duration: Duration,
    /// Error that ended the cycle in `Failed`.
    pub error: Option<CandelaError>,
    /// Non-fatal issues encountered while running the cycle.
    pub warnings: Vec<CandelaError>,
}

impl CycleReport {
    /// Fresh report in `Pending` state.
    #[must_use]
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            state: CycleState::Pending,
            decision: None,
            rows_fetched: 0,
            rows_dropped: 0,
            rows_appended: 0,
            rows_updated: 0,
            gap_count: 0,
            stale: false,
            heal: HealOutcome::NotNeeded,
            final_rows: 0,
            duration: Duration::ZERO,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// True when the cycle reached `Done`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == CycleState::Done
    }
}

/// Summary of a batch run. Always produced, regardless of per-symbol failures.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// One report per requested symbol, in request order.
    pub cycles: Vec<CycleReport>,
    /// Wall-clock time spent on the batch.
    pub duration: Duration,
}

impl BatchReport {
    /// Reports that reached `Done`.
    pub fn succeeded(&self) -> impl Iterator<Item = &CycleReport> {
        self.cycles.iter().filter(|c| c.is_success())
    }

    /// Reports that ended in `Failed`.
    pub fn failed(&self) -> impl Iterator<Item = &CycleReport> {
        self.cycles.iter().filter(|c| !c.is_success())
    }

    /// Look up the report for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&CycleReport> {
        self.cycles.iter().find(|c| c.symbol == symbol)
    }

    /// One-line human summary, e.g. `"3 ok, 1 failed (MSFT)"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let ok = self.succeeded().count();
        let failed: Vec<&str> = self.failed().map(|c| c.symbol.as_str()).collect();
        if failed.is_empty() {
            format!("{ok} ok, 0 failed")
        } else {
            format!("{ok} ok, {} failed ({})", failed.len(), failed.join(", "))
        }
    }
}
