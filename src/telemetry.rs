//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops, so reporting never blocks routing.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (e.g. "deepseek", "claude-sonnet")
//! - `status`: outcome of a provider attempt: "ok" or "error"
//! - `kind`: cache hit kind: "exact" or "semantic"

/// Total provider attempts dispatched by the execution engine.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Provider call duration in seconds.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Total tokens consumed.
///
/// Labels: `provider`.
pub const TOKENS_TOTAL: &str = "huginn_tokens_total";

/// Total spend in micro-dollars (counters are integral).
///
/// Labels: `provider`.
pub const COST_MICRODOLLARS_TOTAL: &str = "huginn_cost_microdollars_total";

/// Total cache hits.
///
/// Labels: `kind` ("exact" | "semantic").
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses (after both exact and semantic probes).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total degraded fallback attempts.
pub const FALLBACKS_TOTAL: &str = "huginn_fallbacks_total";

/// Total requests answered with the unavailable placeholder.
pub const UNAVAILABLE_TOTAL: &str = "huginn_unavailable_total";

/// Total circuit-breaker trips (Closed → Open).
///
/// Labels: `provider`.
pub const CIRCUIT_TRIPS_TOTAL: &str = "huginn_circuit_trips_total";
