use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use candela_core::{BatchReport, CandelaError, CycleReport, Interval, SeriesKey};

use crate::Candela;

impl Candela {
    /// Run one cycle per symbol with a bounded pool of workers.
    ///
    /// Behavior:
    /// - `concurrency` workers drain a shared queue; each runs one symbol's
    ///   cycle to completion before taking the next.
    /// - Every worker shares the orchestrator's rate limiter and cache.
    /// - A failing symbol is reported in its own `CycleReport` and never stops
    ///   the batch. Reports come back in request order.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an empty or duplicate symbol (compared after
    /// trimming and upper-casing). No cycle runs in that case.
    #[tracing::instrument(
        name = "candela::batch",
        skip(self, symbols),
        fields(symbols = symbols.len()),
    )]
    pub async fn run_batch<S: AsRef<str>>(
        &self,
        symbols: &[S],
        interval: Interval,
        force_full: bool,
    ) -> Result<BatchReport, CandelaError> {
        let mut seen: HashSet<String> = HashSet::with_capacity(symbols.len());
        let mut queue: VecDeque<(usize, String)> = VecDeque::with_capacity(symbols.len());
        for (idx, raw) in symbols.iter().enumerate() {
            let symbol = SeriesKey::new(raw, interval).symbol;
            if symbol.is_empty() {
                return Err(CandelaError::InvalidArg(format!(
                    "empty symbol at position {idx}"
                )));
            }
            if !seen.insert(symbol.clone()) {
                return Err(CandelaError::InvalidArg(format!(
                    "duplicate symbol '{symbol}' in batch"
                )));
            }
            queue.push_back((idx, symbol));
        }

        let started = Instant::now();
        let total = queue.len();
        let workers = self.cfg.concurrency.max(1).min(total.max(1));
        let queue = Mutex::new(queue);

        let next = || {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
        };
        let tasks = (0..workers).map(|_| async {
            let mut done: Vec<(usize, CycleReport)> = Vec::new();
            while let Some((idx, symbol)) = next() {
                done.push((idx, self.run_cycle(&symbol, interval, force_full).await));
            }
            done
        });
        let mut indexed: Vec<(usize, CycleReport)> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect();
        indexed.sort_by_key(|(idx, _)| *idx);

        let report = BatchReport {
            cycles: indexed.into_iter().map(|(_, r)| r).collect(),
            duration: started.elapsed(),
        };
        tracing::info!(
            symbols = total,
            workers,
            duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            summary = %report.summary(),
            "batch finished"
        );
        Ok(report)
    }
}
