//! Per-provider usage counters and circuit breaker.
//!
//! [`UsageTracker`] keeps one record per provider: cumulative requests,
//! tokens and cost, a smoothed latency average, a one-minute request window
//! for rate-limit headroom, and the circuit breaker.
//!
//! # Circuit breaker
//!
//! Two states and two transitions:
//!
//! ```text
//!            N consecutive failures
//!   Closed ─────────────────────────► Open
//!     ▲                                 │
//!     └──────────── 1 success ──────────┘
//! ```
//!
//! There is no half-open probing. An open provider is excluded from
//! selection until a success is recorded for it, which only happens through
//! an explicit health check ([`Huginn::probe`](crate::Huginn::probe)) or an
//! administrative reset ([`Huginn::reset_provider`](crate::Huginn::reset_provider)).
//!
//! Records are only mutated by the execution engine; everything public here
//! is a read-only snapshot.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::telemetry;
use crate::types::CompletionResponse;
use crate::HuginnError;

/// Consecutive failures that open a provider's circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Smoothing factor of the latency average. 0.5 weighs the newest
/// observation equally with the running average.
pub const DEFAULT_LATENCY_ALPHA: f64 = 0.5;

/// Width of the request-rate window used for headroom checks.
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Circuit breaker state of a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    /// Eligible for selection.
    #[default]
    Closed,
    /// Excluded from selection until the next recorded success.
    Open,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
        }
    }
}

/// Mutable per-provider record, owned by the tracker.
#[derive(Debug, Default)]
struct UsageRecord {
    requests: u64,
    tokens: u64,
    cost: f64,
    avg_latency_ms: Option<f64>,
    consecutive_failures: u32,
    state: CircuitState,
    trip_count: u32,
    /// Start times of successful requests inside [`RATE_WINDOW`].
    recent: VecDeque<Instant>,
}

impl UsageRecord {
    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.recent.front() {
            if now.duration_since(*front) >= RATE_WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    fn requests_in_window(&self, now: Instant) -> u32 {
        self.recent
            .iter()
            .filter(|t| now.duration_since(**t) < RATE_WINDOW)
            .count() as u32
    }

    fn snapshot(&self, provider: &str, now: Instant) -> UsageSnapshot {
        UsageSnapshot {
            provider: provider.to_string(),
            requests: self.requests,
            tokens: self.tokens,
            cost: self.cost,
            avg_latency: self
                .avg_latency_ms
                .map(|ms| Duration::from_micros((ms * 1000.0) as u64)),
            consecutive_failures: self.consecutive_failures,
            state: self.state,
            trip_count: self.trip_count,
            requests_last_minute: self.requests_in_window(now),
        }
    }
}

/// Read-only view of one provider's usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub provider: String,
    pub requests: u64,
    pub tokens: u64,
    /// Cumulative cost in USD.
    pub cost: f64,
    pub avg_latency: Option<Duration>,
    pub consecutive_failures: u32,
    pub state: CircuitState,
    /// Times this provider's circuit has opened.
    pub trip_count: u32,
    pub requests_last_minute: u32,
}

impl UsageSnapshot {
    /// Requests served per USD spent; 0 when nothing was spent.
    pub fn cost_efficiency(&self) -> f64 {
        if self.cost > 0.0 {
            self.requests as f64 / self.cost
        } else {
            0.0
        }
    }
}

/// Aggregate usage across all providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub providers: Vec<UsageSnapshot>,
    pub total_requests: u64,
    pub total_cost: f64,
    /// Mean of the providers' average latencies.
    pub mean_latency: Option<Duration>,
}

/// Concurrent per-provider usage and circuit-breaker tracker.
#[derive(Debug)]
pub struct UsageTracker {
    records: DashMap<String, UsageRecord>,
    failure_threshold: u32,
    latency_alpha: f64,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_LATENCY_ALPHA)
    }
}

impl UsageTracker {
    /// Create a tracker that opens a circuit after `failure_threshold`
    /// consecutive failures and smooths latency with `latency_alpha`.
    pub fn new(failure_threshold: u32, latency_alpha: f64) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&latency_alpha),
            "alpha must be in [0.0, 1.0]"
        );
        Self {
            records: DashMap::new(),
            failure_threshold: failure_threshold.max(1),
            latency_alpha,
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Record a successful call: counters grow, latency is folded into the
    /// average, and the failure counter is cleared (closing the circuit).
    pub(crate) fn record_success(&self, provider: &str, response: &CompletionResponse) {
        let now = Instant::now();
        let mut record = self.records.entry(provider.to_string()).or_default();
        record.prune(now);
        record.requests += 1;
        record.tokens += u64::from(response.tokens_used);
        record.cost += response.cost;
        record.recent.push_back(now);

        let observed = response.latency.as_secs_f64() * 1000.0;
        record.avg_latency_ms = Some(match record.avg_latency_ms {
            None => observed,
            Some(avg) => self.latency_alpha * observed + (1.0 - self.latency_alpha) * avg,
        });

        record.consecutive_failures = 0;
        if record.state == CircuitState::Open {
            record.state = CircuitState::Closed;
            info!(provider, "circuit closed after success");
        }
    }

    /// Record a failed call. Returns the circuit state after the failure.
    pub(crate) fn record_failure(&self, provider: &str, error: &HuginnError) -> CircuitState {
        let mut record = self.records.entry(provider.to_string()).or_default();
        record.consecutive_failures += 1;
        warn!(
            provider,
            failures = record.consecutive_failures,
            error = %error,
            "provider call failed"
        );

        if record.state == CircuitState::Closed
            && record.consecutive_failures >= self.failure_threshold
        {
            record.state = CircuitState::Open;
            record.trip_count += 1;
            metrics::counter!(telemetry::CIRCUIT_TRIPS_TOTAL, "provider" => provider.to_owned())
                .increment(1);
            info!(
                provider,
                failures = record.consecutive_failures,
                trips = record.trip_count,
                "circuit opened"
            );
        }
        record.state
    }

    /// Administratively close a provider's circuit and clear its failures.
    ///
    /// Returns `false` if nothing was recorded for the provider yet.
    pub(crate) fn reset(&self, provider: &str) -> bool {
        match self.records.get_mut(provider) {
            Some(mut record) => {
                record.consecutive_failures = 0;
                if record.state == CircuitState::Open {
                    record.state = CircuitState::Closed;
                    info!(provider, "circuit closed by reset");
                }
                true
            }
            None => false,
        }
    }

    /// Drop every record.
    pub(crate) fn clear(&self) {
        self.records.clear();
    }

    /// Circuit state of a provider. Unknown providers are closed.
    pub fn state(&self, provider: &str) -> CircuitState {
        self.records
            .get(provider)
            .map(|r| r.state)
            .unwrap_or_default()
    }

    pub fn is_open(&self, provider: &str) -> bool {
        self.state(provider) == CircuitState::Open
    }

    pub fn consecutive_failures(&self, provider: &str) -> u32 {
        self.records
            .get(provider)
            .map(|r| r.consecutive_failures)
            .unwrap_or(0)
    }

    /// Successful requests started within the last minute.
    pub fn requests_last_minute(&self, provider: &str) -> u32 {
        let now = Instant::now();
        self.records
            .get(provider)
            .map(|r| r.requests_in_window(now))
            .unwrap_or(0)
    }

    pub fn snapshot(&self, provider: &str) -> Option<UsageSnapshot> {
        let now = Instant::now();
        self.records.get(provider).map(|r| r.snapshot(provider, now))
    }

    /// Snapshots of every tracked provider, sorted by name.
    pub fn snapshots(&self) -> Vec<UsageSnapshot> {
        let now = Instant::now();
        let mut all: Vec<_> = self
            .records
            .iter()
            .map(|entry| entry.value().snapshot(entry.key(), now))
            .collect();
        all.sort_by(|a, b| a.provider.cmp(&b.provider));
        all
    }

    /// Aggregate usage analytics.
    pub fn report(&self) -> UsageReport {
        let providers = self.snapshots();
        let total_requests = providers.iter().map(|p| p.requests).sum();
        let total_cost = providers.iter().map(|p| p.cost).sum();
        let latencies: Vec<Duration> = providers.iter().filter_map(|p| p.avg_latency).collect();
        let mean_latency = (!latencies.is_empty())
            .then(|| latencies.iter().sum::<Duration>() / latencies.len() as u32);
        UsageReport {
            providers,
            total_requests,
            total_cost,
            mean_latency,
        }
    }
}
