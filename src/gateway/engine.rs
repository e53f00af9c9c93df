//! The router: cache, selection, execution, and fallback.
//!
//! # Request lifecycle
//!
//! ```text
//! submit(request)
//!     │
//!     ├─► cache.lookup ───────────────────────────► Answered (cached)
//!     │
//!     ├─► select ─► call provider ─► cache.store ─► Answered
//!     │                 │
//!     │                 │ failure recorded against the provider
//!     │                 ▼
//!     ├─► select(degraded) ─► call provider ─────► Degraded (not cached)
//!     │                            │
//!     │                            ▼ failure
//!     └──────────────────────────────────────────► Unavailable (placeholder)
//! ```
//!
//! Each step strictly follows the previous one within a request. Requests
//! are independent of each other; the tracker and cache are safe to share.
//!
//! Fallback is one level deep. The failed provider is not excluded by name:
//! the degraded request only avoids it if its circuit has opened or it no
//! longer scores best.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::RouterConfig;
use super::builder::HuginnBuilder;
use crate::cache::ResponseCache;
use crate::providers::selector::{self, RankedProvider};
use crate::providers::{ProviderRegistry, UsageReport, UsageTracker};
use crate::telemetry;
use crate::types::{
    Complexity, CompletionRequest, CompletionResponse, Message, Outcome, ProviderProfile,
};
use crate::{HuginnError, Result};

/// Output length (chars) at which the length component of confidence saturates.
const CONFIDENCE_LENGTH_SATURATION: f64 = 100.0;

/// Confidence score for `text` produced by a provider with `reliability`:
/// up to 30 points for length, up to 70 for reliability.
pub fn confidence(text: &str, reliability: f64) -> u8 {
    let length = (text.chars().count() as f64 / CONFIDENCE_LENGTH_SATURATION).min(1.0);
    (length * 30.0 + reliability.clamp(0.0, 1.0) * 70.0).round() as u8
}

/// Counts from [`Huginn::warm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Requests answered by a provider and stored.
    pub warmed: usize,
    /// Requests already cached.
    pub skipped: usize,
    /// Requests that could not be answered by their primary provider.
    pub failed: usize,
}

/// Cost-aware completion router.
///
/// Owns the provider registry, usage tracker, and response cache. Construct
/// one per process (or per test) with [`Huginn::builder`] and share it
/// behind an `Arc`.
#[derive(Debug)]
pub struct Huginn {
    registry: ProviderRegistry,
    usage: UsageTracker,
    cache: Option<ResponseCache>,
    config: RouterConfig,
}

impl Huginn {
    /// Create a new builder.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }

    pub(crate) fn new(
        registry: ProviderRegistry,
        usage: UsageTracker,
        cache: Option<ResponseCache>,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            usage,
            cache,
            config,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Read-only view of provider usage and circuit state.
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn usage_report(&self) -> UsageReport {
        self.usage.report()
    }

    /// The response cache, if enabled.
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Answer `request`, from the cache if possible.
    ///
    /// Never fails: when both the primary and the degraded attempt fail the
    /// result is [`Outcome::Unavailable`] carrying the placeholder response.
    /// Primary answers are cached under `request`. Degraded answers are cached
    /// under [`request.degraded()`](CompletionRequest::degraded), the request
    /// that was actually sent.
    #[instrument(name = "huginn.submit", skip_all, fields(
        complexity = request.complexity().as_str(),
        caller = request.caller().unwrap_or(""),
    ))]
    pub async fn submit(&self, request: &CompletionRequest) -> Outcome {
        let start = Instant::now();

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.lookup(request)) {
            return Outcome::Answered(cached);
        }

        match self.execute(request).await {
            Ok(Outcome::Answered(response)) => {
                if let Some(cache) = &self.cache {
                    cache.store(request, &response);
                }
                Outcome::Answered(response)
            }
            Ok(Outcome::Degraded(response)) => {
                if let Some(cache) = &self.cache {
                    cache.store(&request.degraded(), &response);
                }
                Outcome::Degraded(response)
            }
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::counter!(telemetry::UNAVAILABLE_TOTAL).increment(1);
                warn!(error = %e, "returning unavailable placeholder");
                Outcome::Unavailable(CompletionResponse::unavailable(start.elapsed()))
            }
        }
    }

    /// Route `request` to a provider, falling back once to a degraded
    /// request. Bypasses the cache.
    ///
    /// Returns [`Outcome::Answered`] or [`Outcome::Degraded`]; fails with
    /// [`HuginnError::AllProvidersExhausted`] when both attempts fail.
    pub async fn execute(&self, request: &CompletionRequest) -> Result<Outcome> {
        let primary = match self.attempt(request).await {
            Ok(response) => return Ok(Outcome::Answered(response)),
            Err(e) => e,
        };

        metrics::counter!(telemetry::FALLBACKS_TOTAL).increment(1);
        warn!(error = %primary, "primary attempt failed, trying degraded request");

        let degraded = request.degraded();
        match self.attempt(&degraded).await {
            Ok(response) => Ok(Outcome::Degraded(response)),
            Err(fallback) => {
                warn!(error = %fallback, "degraded attempt failed");
                Err(HuginnError::AllProvidersExhausted)
            }
        }
    }

    /// Best provider for `request` right now.
    pub fn select(&self, request: &CompletionRequest) -> Result<Arc<ProviderProfile>> {
        selector::select(request, &self.registry, &self.usage)
    }

    /// Every eligible, in-budget provider with its score, best first.
    pub fn rank(&self, request: &CompletionRequest) -> Vec<RankedProvider> {
        selector::rank(request, &self.registry, &self.usage)
    }

    /// One selection plus one provider call.
    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let profile = self.select(request)?;
        self.call(&profile, request).await
    }

    /// Call `profile`'s client and record the result in the tracker.
    #[instrument(name = "huginn.call", skip_all, fields(provider = %profile.name))]
    async fn call(
        &self,
        profile: &ProviderProfile,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        let client = self
            .registry
            .client(&profile.name)
            .ok_or(HuginnError::NoEligibleProvider)?;
        let deadline = request.timeout().or(self.config.default_timeout);

        let start = Instant::now();
        let call = client.complete(
            profile,
            request.messages(),
            request.max_tokens(),
            request.temperature(),
        );
        let result = match deadline {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .unwrap_or_else(|_| {
                    Err(HuginnError::Timeout {
                        provider: profile.name.clone(),
                        after,
                    })
                }),
            None => call.await,
        };
        let latency = start.elapsed();

        let result = result.and_then(|completion| {
            if completion.text.trim().is_empty() {
                Err(HuginnError::EmptyResponse)
            } else {
                Ok(completion)
            }
        });

        match result {
            Ok(completion) => {
                let cost = profile.cost_for_tokens(u64::from(completion.tokens_used));
                let response = CompletionResponse {
                    confidence: confidence(&completion.text, profile.reliability),
                    content: completion.text,
                    provider: profile.name.clone(),
                    tokens_used: completion.tokens_used,
                    cost,
                    latency,
                    cached: false,
                    created_at: Utc::now(),
                };
                self.usage.record_success(&profile.name, &response);
                record_call(&profile.name, latency, true);
                record_spend(&profile.name, &response);
                debug!(
                    tokens = response.tokens_used,
                    cost = response.cost,
                    latency_ms = latency.as_millis() as u64,
                    "provider call succeeded"
                );
                Ok(response)
            }
            Err(e) => {
                self.usage.record_failure(&profile.name, &e);
                record_call(&profile.name, latency, false);
                Err(HuginnError::ProviderCallFailed {
                    provider: profile.name.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Health-check a provider with a minimal request, bypassing selection,
    /// the circuit breaker, and the cache.
    ///
    /// The result is recorded like any other call, so a successful probe
    /// closes an open circuit.
    pub async fn probe(&self, name: &str) -> Result<CompletionResponse> {
        let profile = self
            .registry
            .get(name)
            .ok_or_else(|| HuginnError::InvalidInput(format!("unknown provider '{name}'")))?;
        let request = CompletionRequest::builder()
            .message(Message::user("ping"))
            .complexity(Complexity::Simple)
            .max_tokens(8)
            .build()?;
        let result = self.call(&profile, &request).await;
        match &result {
            Ok(_) => info!(provider = name, "probe succeeded"),
            Err(e) => warn!(provider = name, error = %e, "probe failed"),
        }
        result
    }

    /// Close a provider's circuit and clear its failure count.
    ///
    /// Returns `false` if the provider has no usage record.
    pub fn reset_provider(&self, name: &str) -> bool {
        self.usage.reset(name)
    }

    /// Forget all usage records and circuit states.
    pub fn reset_usage(&self) {
        self.usage.clear();
        info!("usage records cleared");
    }

    /// Answer each not-yet-cached request so later callers hit the cache.
    ///
    /// Degraded answers are not cached and count as failures.
    pub async fn warm(&self, requests: &[CompletionRequest]) -> WarmReport {
        let mut report = WarmReport::default();
        let Some(cache) = &self.cache else {
            report.skipped = requests.len();
            return report;
        };

        for request in requests {
            if cache.contains(request) {
                report.skipped += 1;
                continue;
            }
            match self.execute(request).await {
                Ok(Outcome::Answered(response)) if cache.store(request, &response) => {
                    report.warmed += 1;
                }
                _ => report.failed += 1,
            }
        }
        info!(
            warmed = report.warmed,
            skipped = report.skipped,
            failed = report.failed,
            "cache warmed"
        );
        report
    }

    /// Run the cache optimization sweep every `interval` on the current
    /// tokio runtime.
    ///
    /// The task holds only a weak reference and stops once the router is
    /// dropped; abort the handle to stop it earlier.
    /// A zero `interval` is treated as one second.
    pub fn spawn_maintenance(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let router: Weak<Self> = Arc::downgrade(self);
        let interval = if interval.is_zero() {
            Duration::from_secs(1)
        } else {
            interval
        };
        let first = Instant::now() + interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, interval);
            loop {
                ticker.tick().await;
                let Some(router) = router.upgrade() else {
                    break;
                };
                if let Some(cache) = router.cache() {
                    let report = cache.optimize();
                    if report.removed > 0 {
                        info!(
                            removed = report.removed,
                            cost_forfeited = report.cost_forfeited,
                            "maintenance sweep"
                        );
                    }
                }
            }
        })
    }
}

// ============================================================================
// Metrics recording
// ============================================================================

/// Record attempt outcome metrics (counter + histogram).
fn record_call(provider: &str, latency: Duration, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
    )
    .record(latency.as_secs_f64());
}

/// Record token and cost counters for a successful call.
fn record_spend(provider: &str, response: &CompletionResponse) {
    metrics::counter!(telemetry::TOKENS_TOTAL, "provider" => provider.to_owned())
        .increment(u64::from(response.tokens_used));
    metrics::counter!(telemetry::COST_MICRODOLLARS_TOTAL, "provider" => provider.to_owned())
        .increment((response.cost * 1_000_000.0).round() as u64);
}
