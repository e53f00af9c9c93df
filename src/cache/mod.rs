//! Response caching.
//!
//! - [`fingerprint`]: exact-match keys, keyword signatures, and Jaccard
//!   similarity.
//! - [`response::ResponseCache`]: bounded TTL cache of provider responses
//!   with exact and semantic lookup, targeted invalidation, an optimization
//!   sweep, and analytics.

pub mod fingerprint;
pub mod response;

pub use fingerprint::{KeywordExtractor, context_hash, fingerprint, jaccard};
pub use response::{
    CacheAnalytics, CacheConfig, HealthReport, HealthStatus, HitKind, InvalidationFilter,
    PopularEntry, ResponseCache, SweepReport,
};
