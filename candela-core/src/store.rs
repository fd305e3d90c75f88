use async_trait::async_trait;

use crate::{CandelaError, Series, SeriesKey, StoredSeries};

/// Persistence collaborator for series.
///
/// The orchestrator reads once at the start of a cycle and writes the full
/// series once at the end. Serialization format and location belong to the
/// implementation.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Load the persisted series for `key`; `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    /// Any error is treated by callers as "no existing series".
    async fn load(&self, key: &SeriesKey) -> Result<Option<StoredSeries>, CandelaError>;

    /// Replace the persisted series for `key`.
    ///
    /// # Errors
    /// A failure ends the cycle in `Failed`.
    async fn save(&self, key: &SeriesKey, series: &Series) -> Result<(), CandelaError>;
}
