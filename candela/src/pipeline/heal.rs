//! One-shot full refetch that replaces a damaged series.

use chrono::{DateTime, Utc};

use candela_core::{
    CandelaError, FetchRequest, Series, SeriesKey, check_freshness, standardize, validate,
};

use crate::Candela;

/// Why a heal was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealTrigger {
    Gaps(usize),
    Stale(CandelaError),
    Invalid(CandelaError),
}

impl std::fmt::Display for HealTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gaps(n) => write!(f, "{n} recent gap(s)"),
            Self::Stale(e) | Self::Invalid(e) => write!(f, "{e}"),
        }
    }
}

impl Candela {
    /// Fetch the full history for `key` bypassing the cache and return it only
    /// if it is usable as a wholesale replacement.
    ///
    /// The replacement must standardize to at least one candle, validate, and
    /// pass the freshness check whenever one applies at `now`.
    #[tracing::instrument(
        name = "candela::heal",
        skip(self, trigger),
        fields(series = %key, trigger = %trigger),
    )]
    pub(crate) async fn heal(
        &self,
        key: &SeriesKey,
        trigger: &HealTrigger,
        now: DateTime<Utc>,
    ) -> Result<Series, CandelaError> {
        let payload = self
            .fetcher
            .fetch(FetchRequest::heal(key.symbol.clone(), key.interval))
            .await
            .into_result()?;

        let (standardized, stats) = standardize(&payload, &self.cfg.market);
        let healed = Series::from_candles(key.clone(), standardized.into_candles());
        if healed.is_empty() {
            return Err(CandelaError::Validation(format!(
                "heal fetch for {key} produced no usable candles ({} dropped)",
                stats.dropped()
            )));
        }
        validate(&healed)?;
        if self.cfg.freshness.enabled {
            check_freshness(&healed, now, &self.cfg.market)?;
        }

        tracing::info!(rows = healed.len(), "heal fetch accepted");
        Ok(healed)
    }
}
