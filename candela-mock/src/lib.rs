//! Test doubles for the candela workspace.
//!
//! - [`DynamicMockProvider`]: a `CandleConnector` scripted from a controller
//! - [`MemoryStore`]: an in-memory `SeriesStore` with failure injection
//! - [`FixedClock`]: a manually driven `Clock`
//! - [`fixtures`]: deterministic raw payload builders

mod clock;
mod dynamic;
pub mod fixtures;
mod store;

pub use clock::FixedClock;
pub use dynamic::{DynamicMockController, DynamicMockProvider, MockBehavior, MockCall};
pub use store::MemoryStore;
