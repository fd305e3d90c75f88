use std::collections::{BTreeMap, btree_map::Entry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Candle, Series};

/// What a merge did to the existing series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Incoming candles at new timestamps.
    pub appended: usize,
    /// Incoming candles folded into the most recent existing candle.
    pub updated: usize,
    /// Incoming candles overlapping older existing candles (existing wins).
    pub ignored: usize,
}

/// Merge `incoming` into `existing`. See [`merge_with_stats`].
#[must_use]
pub fn merge(existing: &Series, incoming: &Series) -> Series {
    merge_with_stats(existing, incoming).0
}

/// Merge `incoming` into `existing`, returning the new series and counters.
///
/// - Only the single most recent existing candle is update-eligible: its
///   `high` becomes the max, `low` the min, `close` and `volume` are taken
///   from the incoming candle, and `open` is kept.
/// - Incoming candles at any other existing timestamp are ignored.
/// - Incoming candles at new timestamps are appended.
///
/// The result is sorted ascending with unique timestamps and the operation is
/// idempotent: merging the same incoming series twice yields the same result.
/// The result carries the key of `existing`.
#[must_use]
pub fn merge_with_stats(existing: &Series, incoming: &Series) -> (Series, MergeStats) {
    let mut stats = MergeStats::default();
    let latest: Option<DateTime<Utc>> = existing.last().map(|c| c.ts);

    let mut by_ts: BTreeMap<DateTime<Utc>, Candle> = existing
        .candles()
        .iter()
        .map(|c| (c.ts, c.clone()))
        .collect();

    for c in incoming.candles() {
        match by_ts.entry(c.ts) {
            Entry::Occupied(mut slot) if Some(c.ts) == latest => {
                let cur = slot.get_mut();
                cur.high = cur.high.max(c.high);
                cur.low = cur.low.min(c.low);
                cur.close = c.close;
                cur.volume = c.volume;
                stats.updated += 1;
            }
            Entry::Occupied(_) => stats.ignored += 1,
            Entry::Vacant(slot) => {
                slot.insert(c.clone());
                stats.appended += 1;
            }
        }
    }

    let merged = Series::from_sorted(existing.key().clone(), by_ts.into_values().collect());
    (merged, stats)
}
