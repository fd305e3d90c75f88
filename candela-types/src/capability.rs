use core::fmt;
use serde::{Deserialize, Serialize};

/// Capability labels a provider can advertise.
///
/// The set is closed: a provider either serves the short recent window
/// (`FetchMinimal`), the full retained history (`FetchFull`), or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Short recent window of candles ("compact" in most vendor APIs).
    FetchMinimal,
    /// Maximum available history, used for rebuilds and repairs.
    FetchFull,
}

impl Capability {
    /// Stable, kebab-case identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchMinimal => "fetch-minimal",
            Self::FetchFull => "fetch-full",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
