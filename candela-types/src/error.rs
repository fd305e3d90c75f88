use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Variants map onto how the ingestion pipeline reacts to them: transient
/// provider failures are retried, hard provider rejections and malformed
/// payloads abort the symbol's fetch, validation failures trigger a heal, and
/// storage failures are either reinterpreted as missing data (load) or end the
/// cycle (save).
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandelaError {
    /// Connection-level failure talking to the provider. Retryable.
    #[error("network error via {provider}: {msg}")]
    Network {
        /// Provider name that failed.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// An individual provider call exceeded the configured timeout. Retryable.
    #[error("provider timed out: {capability} via {provider}")]
    ProviderTimeout {
        /// Provider name that timed out.
        provider: String,
        /// Capability label (e.g. "fetch-minimal", "fetch-full").
        capability: String,
    },

    /// The provider signalled that the caller is over quota. Retryable with a
    /// longer backoff.
    #[error("rate limited by {provider}: {note}")]
    RateLimited {
        /// Provider name that throttled the call.
        provider: String,
        /// Provider-supplied note, if any.
        note: String,
    },

    /// Hard provider rejection (unknown symbol, invalid request). Not retried.
    #[error("{provider} rejected request: {msg}")]
    Provider {
        /// Provider name that rejected the call.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// Malformed provider payload. Not retried.
    #[error("parse error: {0}")]
    Parse(String),

    /// Freshness, coverage, or standardization checks failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Storage collaborator load/save failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The provider does not implement the requested capability.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// A capability string describing what was requested.
        capability: String,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Cache tier I/O or encoding failure.
    #[error("cache error: {0}")]
    Cache(String),
}

impl CandelaError {
    /// Helper: build a `Network` error.
    pub fn network(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(provider: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build a `RateLimited` error.
    pub fn rate_limited(provider: impl Into<String>, note: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            note: note.into(),
        }
    }

    /// Helper: build a `Provider` error.
    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub fn unsupported(cap: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: cap.into(),
        }
    }

    /// True for failures worth another attempt: network errors, timeouts, and
    /// provider rate-limit signals.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::ProviderTimeout { .. } | Self::RateLimited { .. }
        )
    }

    /// True when the provider explicitly asked us to slow down.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
