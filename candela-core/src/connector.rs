use async_trait::async_trait;

use crate::{Capability, CandelaError, FetchSize, Interval, RawPayload};

/// Role trait for providers that serve the recent compact window.
#[async_trait]
pub trait MinimalProvider: Send + Sync {
    /// Fetch the most recent candles for `symbol`.
    ///
    /// # Errors
    /// `RateLimited` and `Network` are soft; `Provider` and `Parse` are hard.
    async fn fetch_minimal(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<RawPayload, CandelaError>;
}

/// Role trait for providers that serve the full available history.
#[async_trait]
pub trait FullProvider: Send + Sync {
    /// Fetch the whole history the provider retains for `symbol`.
    ///
    /// # Errors
    /// `RateLimited` and `Network` are soft; `Provider` and `Parse` are hard.
    async fn fetch_full(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<RawPayload, CandelaError>;
}

/// Market-data provider consumed by the fetch client.
///
/// Capabilities form a closed set advertised through the `as_*_provider`
/// methods; a `None` means the capability is unsupported.
pub trait CandleConnector: Send + Sync {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Whether the connector serves `interval` at all.
    ///
    /// Default: every interval.
    fn supports_interval(&self, interval: Interval) -> bool {
        let _ = interval;
        true
    }

    /// Advertise the compact-window capability.
    fn as_minimal_provider(&self) -> Option<&dyn MinimalProvider> {
        None
    }

    /// Advertise the full-history capability.
    fn as_full_provider(&self) -> Option<&dyn FullProvider> {
        None
    }

    /// Capabilities this connector advertises.
    fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::with_capacity(2);
        if self.as_minimal_provider().is_some() {
            caps.push(Capability::FetchMinimal);
        }
        if self.as_full_provider().is_some() {
            caps.push(Capability::FetchFull);
        }
        caps
    }
}

/// Dispatch one fetch of `size` to the matching capability.
///
/// # Errors
/// Returns `Unsupported` when the connector lacks the capability or the
/// interval, otherwise whatever the provider returns.
pub async fn fetch_with(
    connector: &dyn CandleConnector,
    symbol: &str,
    interval: Interval,
    size: FetchSize,
) -> Result<RawPayload, CandelaError> {
    if !connector.supports_interval(interval) {
        return Err(CandelaError::unsupported(format!(
            "{}/{}",
            size.capability(),
            interval
        )));
    }
    match size {
        FetchSize::Minimal => match connector.as_minimal_provider() {
            Some(p) => p.fetch_minimal(symbol, interval).await,
            None => Err(CandelaError::unsupported(Capability::FetchMinimal.as_str())),
        },
        FetchSize::Full => match connector.as_full_provider() {
            Some(p) => p.fetch_full(symbol, interval).await,
            None => Err(CandelaError::unsupported(Capability::FetchFull.as_str())),
        },
    }
}
