//! Provider selection.
//!
//! Every eligible provider gets an additive score; the highest total wins.
//!
//! | Term | Value |
//! |---|---|
//! | cost | `COST_WEIGHT / max(estimated_cost, COST_FLOOR_USD)` |
//! | reliability | `reliability * RELIABILITY_WEIGHT` |
//! | latency | `LATENCY_WEIGHT / max(latency_ms, LATENCY_FLOOR_MS)`, critical or timed requests only |
//! | capability | fraction of required capabilities matched `* CAPABILITY_WEIGHT` |
//! | affinity | `AFFINITY_BONUS` if shortlisted for the complexity tier |
//! | headroom | `HEADROOM_BONUS` if under 80 % of the request rate limit |
//!
//! A hard cost budget is a filter, not a term: providers whose estimate
//! exceeds it are dropped before scoring.
//!
//! Selection is greedy and per request. Nothing is reserved, so two
//! concurrent requests may pick the same provider.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use super::registry::ProviderRegistry;
use super::usage::UsageTracker;
use crate::types::{CompletionRequest, Priority, ProviderProfile};
use crate::{HuginnError, Result};

pub const COST_WEIGHT: f64 = 10.0;
pub const RELIABILITY_WEIGHT: f64 = 50.0;
pub const LATENCY_WEIGHT: f64 = 30.0;
pub const CAPABILITY_WEIGHT: f64 = 25.0;
pub const AFFINITY_BONUS: f64 = 20.0;
pub const HEADROOM_BONUS: f64 = 15.0;

/// Estimated costs below one cent all score as one cent.
pub const COST_FLOOR_USD: f64 = 0.01;

const LATENCY_FLOOR_MS: f64 = 100.0;
const HEADROOM_RATIO: f64 = 0.8;

/// Per-term score of one provider for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub cost: f64,
    pub reliability: f64,
    pub latency: f64,
    pub capability: f64,
    pub affinity: f64,
    pub headroom: f64,
    /// Estimated USD cost the cost term was derived from.
    pub estimated_cost: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.cost + self.reliability + self.latency + self.capability + self.affinity + self.headroom
    }
}

/// A scored candidate.
#[derive(Debug, Clone)]
pub struct RankedProvider {
    pub profile: Arc<ProviderProfile>,
    pub score: ScoreBreakdown,
}

/// Whether a request with this priority/timeout is latency sensitive.
fn latency_sensitive(request: &CompletionRequest) -> bool {
    request.priority() == Priority::Critical || request.timeout().is_some()
}

/// Score `profile` for `request`.
pub fn score(
    profile: &ProviderProfile,
    request: &CompletionRequest,
    usage: &UsageTracker,
) -> ScoreBreakdown {
    let estimated_cost = profile.estimate_cost(request);

    let latency = if latency_sensitive(request) {
        LATENCY_WEIGHT / (profile.latency_ms as f64).max(LATENCY_FLOOR_MS)
    } else {
        0.0
    };

    let required = request.capabilities();
    let matched = if required.is_empty() {
        1.0
    } else {
        required.iter().filter(|c| profile.strong_at(**c)).count() as f64 / required.len() as f64
    };

    let affinity = if profile.has_affinity(request.complexity()) {
        AFFINITY_BONUS
    } else {
        0.0
    };

    let in_window = f64::from(usage.requests_last_minute(&profile.name));
    let limit = f64::from(profile.rate_limit.requests_per_minute);
    let headroom = if in_window < limit * HEADROOM_RATIO {
        HEADROOM_BONUS
    } else {
        0.0
    };

    ScoreBreakdown {
        cost: COST_WEIGHT / estimated_cost.max(COST_FLOOR_USD),
        reliability: profile.reliability * RELIABILITY_WEIGHT,
        latency,
        capability: matched * CAPABILITY_WEIGHT,
        affinity,
        headroom,
        estimated_cost,
    }
}

/// Whether the estimated cost fits the request's budget (if any).
pub fn within_budget(profile: &ProviderProfile, request: &CompletionRequest) -> bool {
    match request.cost_budget_cents() {
        Some(cents) => profile.estimate_cost(request) * 100.0 <= cents,
        None => true,
    }
}

/// Eligible, in-budget providers sorted by descending score.
///
/// Ties keep registration order.
pub fn rank(
    request: &CompletionRequest,
    registry: &ProviderRegistry,
    usage: &UsageTracker,
) -> Vec<RankedProvider> {
    let mut ranked: Vec<RankedProvider> = registry
        .list_eligible(request, usage)
        .into_iter()
        .filter(|p| {
            let ok = within_budget(p, request);
            if !ok {
                debug!(provider = %p.name, "over budget");
            }
            ok
        })
        .map(|profile| {
            let score = score(&profile, request, usage);
            RankedProvider { profile, score }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total().total_cmp(&a.score.total()));
    ranked
}

/// Pick the best provider for `request`.
///
/// Fails with [`HuginnError::NoEligibleProvider`] when no provider is
/// capable, executable, closed, and within budget.
#[instrument(skip_all, fields(complexity = request.complexity().as_str()))]
pub fn select(
    request: &CompletionRequest,
    registry: &ProviderRegistry,
    usage: &UsageTracker,
) -> Result<Arc<ProviderProfile>> {
    let ranked = rank(request, registry, usage);
    let best = ranked.into_iter().next().ok_or(HuginnError::NoEligibleProvider)?;
    debug!(
        provider = %best.profile.name,
        score = best.score.total(),
        estimated_cost = best.score.estimated_cost,
        "selected provider"
    );
    Ok(best.profile)
}
