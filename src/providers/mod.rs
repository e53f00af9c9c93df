//! Provider catalog, registry, usage tracking, and selection.
//!
//! The registry knows what exists, the usage tracker knows how it has been
//! behaving, and the selector combines both into a routing decision.

pub mod catalog;
pub mod registry;
pub mod selector;
pub mod traits;
pub mod usage;

pub use catalog::default_catalog;
pub use registry::ProviderRegistry;
pub use selector::{RankedProvider, ScoreBreakdown};
pub use traits::{Completion, CompletionClient};
pub use usage::{CircuitState, UsageReport, UsageSnapshot, UsageTracker};
