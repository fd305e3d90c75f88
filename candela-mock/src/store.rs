use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use candela_core::{CandelaError, Series, SeriesKey, SeriesStore, StoredSeries};

#[derive(Default)]
struct Slot {
    series: Option<Series>,
    size_override: Option<u64>,
}

/// In-memory `SeriesStore` with failure injection.
///
/// Stored size defaults to the JSON-encoded length of the series and can be
/// pinned per key to steer the fetch-size decision.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<SeriesKey, Slot>>,
    fail_load: AtomicBool,
    fail_save: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a series.
    pub async fn insert(&self, series: Series) {
        let key = series.key().clone();
        let mut guard = self.slots.lock().await;
        guard.entry(key).or_default().series = Some(series);
    }

    /// Seed a series and pin the size `load` reports for it.
    pub async fn insert_with_size(&self, series: Series, size_bytes: u64) {
        let mut guard = self.slots.lock().await;
        let slot = guard.entry(series.key().clone()).or_default();
        slot.series = Some(series);
        slot.size_override = Some(size_bytes);
    }

    /// Currently stored series for `key`.
    pub async fn get(&self, key: &SeriesKey) -> Option<Series> {
        self.slots
            .lock()
            .await
            .get(key)
            .and_then(|s| s.series.clone())
    }

    /// Make every subsequent `load` fail.
    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail.
    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn load(&self, key: &SeriesKey) -> Result<Option<StoredSeries>, CandelaError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(CandelaError::Storage(format!("injected load failure for {key}")));
        }
        let guard = self.slots.lock().await;
        let Some(slot) = guard.get(key) else {
            return Ok(None);
        };
        let Some(series) = slot.series.clone() else {
            return Ok(None);
        };
        let size_bytes = match slot.size_override {
            Some(n) => n,
            None => serde_json::to_vec(&series)
                .map_err(|e| CandelaError::Storage(e.to_string()))?
                .len() as u64,
        };
        Ok(Some(StoredSeries { series, size_bytes }))
    }

    async fn save(&self, key: &SeriesKey, series: &Series) -> Result<(), CandelaError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(CandelaError::Storage(format!("injected save failure for {key}")));
        }
        let mut guard = self.slots.lock().await;
        let slot = guard.entry(key.clone()).or_default();
        slot.series = Some(series.clone());
        slot.size_override = None;
        drop(guard);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
