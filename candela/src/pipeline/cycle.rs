//! One symbol's ingestion cycle.
//!
//! `Pending → Deciding → Fetching → Standardizing → Merging → GapChecking →
//! (Healing →) Trimming → Done | Failed`. A failed cycle never reaches the
//! store, so the previously persisted series stays untouched.

use std::time::Instant;

use candela_core::{
    CandelaError, CycleReport, CycleState, FetchRequest, FetchSize, HealOutcome, Interval,
    Series, SeriesKey, StoredSeries, check_freshness, detect_gaps, merge_with_stats, standardize,
    trim, validate,
};

use crate::Candela;
use crate::pipeline::heal::HealTrigger;

impl Candela {
    /// Run one ingestion cycle for `symbol` at `interval`.
    ///
    /// Behavior:
    /// - A storage load error is treated as "nothing stored" and reported as a
    ///   warning; the cycle continues with a full fetch.
    /// - A fetch that fails after retries, or a save error, ends the cycle in
    ///   `Failed` with the error attached.
    /// - Recent gaps, a stale series, or an invalid merge trigger at most one
    ///   heal. A rejected heal keeps the merged series and adds a warning.
    ///
    /// Emits one `info` event on the `candela::cycle` target summarizing the cycle.
    pub async fn run_cycle(
        &self,
        symbol: &str,
        interval: Interval,
        force_full: bool,
    ) -> CycleReport {
        let key = SeriesKey::new(symbol, interval);
        let started = Instant::now();
        let mut report = CycleReport::new(key.symbol.clone(), interval);

        if key.symbol.is_empty() {
            report.state = CycleState::Failed;
            report.error = Some(CandelaError::InvalidArg("empty symbol".to_string()));
        } else if let Err(e) = self.drive(&key, force_full, &mut report).await {
            report.state = CycleState::Failed;
            report.error = Some(e);
        }
        report.duration = started.elapsed();

        tracing::info!(
            target: "candela::cycle",
            symbol = %report.symbol,
            interval = %report.interval,
            state = ?report.state,
            decision = report.decision.map(FetchSize::as_str),
            rows_fetched = report.rows_fetched,
            rows_dropped = report.rows_dropped,
            rows_merged = report.rows_appended + report.rows_updated,
            gap_count = report.gap_count,
            heal_triggered = report.heal.was_triggered(),
            heal = ?report.heal,
            final_rows = report.final_rows,
            duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            error = report.error.as_ref().map(tracing::field::display),
            "cycle finished"
        );
        report
    }

    async fn load_existing(
        &self,
        key: &SeriesKey,
        report: &mut CycleReport,
    ) -> Option<StoredSeries> {
        match self.store.load(key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(series = %key, error = %e, "load failed; treating as missing");
                report.warnings.push(e);
                None
            }
        }
    }

    async fn drive(
        &self,
        key: &SeriesKey,
        force_full: bool,
        report: &mut CycleReport,
    ) -> Result<(), CandelaError> {
        let now = self.clock.now();
        let market = &self.cfg.market;

        report.state = CycleState::Deciding;
        let existing = self.load_existing(key, report).await;
        let size = self.decider.decide(key, existing.as_ref(), force_full, now);
        report.decision = Some(size);

        report.state = CycleState::Fetching;
        let payload = self
            .fetcher
            .fetch(FetchRequest::new(key.symbol.clone(), key.interval, size))
            .await
            .into_result()?;

        report.state = CycleState::Standardizing;
        let (standardized, stats) = standardize(&payload, market);
        let incoming = Series::from_candles(key.clone(), standardized.into_candles());
        report.rows_fetched = payload.rows.len();
        report.rows_dropped = stats.dropped();

        report.state = CycleState::Merging;
        let base = existing.map_or_else(|| Series::empty(key.clone()), |s| s.series);
        let (merged, merge_stats) = merge_with_stats(&base, &incoming);
        report.rows_appended = merge_stats.appended;
        report.rows_updated = merge_stats.updated;

        report.state = CycleState::GapChecking;
        let gaps = detect_gaps(&merged, self.cfg.gaps.tolerance_for(key.interval), market);
        report.gap_count = gaps.len();
        // Only gaps a full refetch could actually fill.
        let recent_gaps = gaps.repairable_from(&incoming).count();
        let stale = if self.cfg.freshness.enabled {
            check_freshness(&merged, now, market).err()
        } else {
            None
        };
        report.stale = stale.is_some();

        let trigger = match (validate(&merged), stale) {
            (Err(e), _) => Some(HealTrigger::Invalid(e)),
            (Ok(()), Some(e)) => Some(HealTrigger::Stale(e)),
            (Ok(()), None) if recent_gaps > 0 => Some(HealTrigger::Gaps(recent_gaps)),
            _ => None,
        };

        let mut series = merged;
        if let Some(trigger) = trigger {
            report.state = CycleState::Healing;
            match self.heal(key, &trigger, now).await {
                Ok(healed) => {
                    report.heal = HealOutcome::Healed { rows: healed.len() };
                    report.stale = false;
                    series = healed;
                }
                Err(e) => {
                    tracing::warn!(
                        series = %key,
                        trigger = %trigger,
                        error = %e,
                        "heal rejected; keeping merged series"
                    );
                    report.heal = HealOutcome::Failed {
                        reason: e.to_string(),
                    };
                    report.warnings.push(e);
                }
            }
        }

        report.state = CycleState::Trimming;
        let trimmed = trim(&series, self.cfg.retention.window_for(key.interval), now);
        self.store.save(key, &trimmed).await?;
        report.final_rows = trimmed.len();

        report.state = CycleState::Done;
        Ok(())
    }
}
