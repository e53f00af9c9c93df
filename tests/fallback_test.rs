//! Integration tests for the execution engine's fallback behaviour.
//!
//! Covers the degraded retry, the unavailable placeholder, and the exact
//! cache hit scenario.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use huginn::{
    Capability, Complexity, Completion, CompletionClient, CompletionRequest, CompletionResponse,
    Huginn, HuginnError, Message, Outcome, ProviderProfile, RateLimit, Result,
};

// ============================================================================
// Mock clients
// ============================================================================

struct Answering {
    reply: &'static str,
    calls: AtomicUsize,
}

impl Answering {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionClient for Answering {
    fn name(&self) -> &str {
        "answering"
    }

    async fn complete(
        &self,
        _provider: &ProviderProfile,
        _messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion::new(self.reply, 120))
    }
}

struct Failing {
    calls: AtomicUsize,
}

impl Failing {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionClient for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(
        &self,
        _provider: &ProviderProfile,
        _messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HuginnError::Http("connection refused".into()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Analysis specialist: top scorer for moderate analysis requests, unable to
/// serve general chat.
fn analyst() -> ProviderProfile {
    ProviderProfile {
        name: "analyst".into(),
        cost_per_token: 0.0,
        request_cost: 0.0,
        max_tokens: 8192,
        strengths: vec![Capability::DomainAnalysis, Capability::ComplexReasoning],
        affinity: vec![Complexity::Moderate],
        rate_limit: RateLimit {
            requests_per_minute: 100,
            tokens_per_minute: 100_000,
        },
        latency_ms: 900,
        reliability: 0.99,
    }
}

/// Generalist: can serve both analysis and general chat.
fn generalist() -> ProviderProfile {
    ProviderProfile {
        name: "generalist".into(),
        cost_per_token: 0.000_01,
        request_cost: 0.001,
        max_tokens: 4096,
        strengths: vec![Capability::GeneralChat, Capability::DomainAnalysis],
        affinity: vec![Complexity::Simple],
        rate_limit: RateLimit {
            requests_per_minute: 100,
            tokens_per_minute: 100_000,
        },
        latency_ms: 700,
        reliability: 0.9,
    }
}

fn lineup_request() -> CompletionRequest {
    CompletionRequest::builder()
        .message(Message::user("What is my optimal lineup?"))
        .capability(Capability::DomainAnalysis)
        .complexity(Complexity::Moderate)
        .build()
        .unwrap()
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn primary_failure_falls_back_to_degraded_request() {
    let primary = Failing::new();
    let secondary = Answering::new("Start your studs.");
    let router = Huginn::builder()
        .provider(analyst(), primary.clone())
        .provider(generalist(), secondary.clone())
        .build()
        .unwrap();

    let request = lineup_request();
    assert_eq!(router.select(&request).unwrap().name, "analyst");

    let outcome = router.submit(&request).await;
    assert!(outcome.is_degraded());
    let response = outcome.response();
    assert_eq!(response.provider, "generalist");
    assert_eq!(response.content, "Start your studs.");
    assert!(!response.cached);

    assert_eq!(router.usage().consecutive_failures("analyst"), 1);
    assert_eq!(router.usage().consecutive_failures("generalist"), 0);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn degraded_answers_are_cached_under_the_degraded_request() {
    let failing = Failing::new();
    let answering = Answering::new("fallback answer");
    let router = Huginn::builder()
        .provider(analyst(), failing.clone())
        .provider(generalist(), answering.clone())
        .build()
        .unwrap();

    let request = lineup_request();
    assert!(router.submit(&request).await.is_degraded());

    let cache = router.cache().unwrap();
    assert!(!cache.contains(&request));
    assert!(cache.contains(&request.degraded()));

    // The simplified request is served from the cache.
    let simplified = router.submit(&request.degraded()).await;
    assert!(simplified.response().cached);
    assert_eq!(simplified.response().content, "fallback answer");
    assert_eq!(answering.calls.load(Ordering::SeqCst), 1);

    // The full request is not answered with the simplified one.
    let again = router.submit(&request).await;
    assert!(again.is_degraded());
    assert!(!again.response().cached);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn selection_failure_still_tries_degraded_request() {
    // Nobody is strong at code generation, but the degraded request only
    // needs general chat.
    let router = Huginn::builder()
        .provider(generalist(), Answering::new("here you go"))
        .build()
        .unwrap();

    let request = CompletionRequest::builder()
        .message(Message::user("write a parser"))
        .capability(Capability::CodeGeneration)
        .build()
        .unwrap();

    assert!(matches!(
        router.select(&request),
        Err(HuginnError::NoEligibleProvider)
    ));
    let outcome = router.submit(&request).await;
    assert!(outcome.is_degraded());
    assert_eq!(outcome.response().provider, "generalist");
}

// ============================================================================
// Total failure
// ============================================================================

#[tokio::test]
async fn total_failure_returns_placeholder() {
    let router = Huginn::builder()
        .provider(analyst(), Failing::new())
        .provider(generalist(), Failing::new())
        .build()
        .unwrap();

    let request = lineup_request();
    let outcome = router.submit(&request).await;

    assert!(outcome.is_unavailable());
    let response = outcome.response();
    assert_eq!(response.cost, 0.0);
    assert_eq!(response.confidence, 0);
    assert!(!response.cached);
    assert!(response.is_placeholder());

    // The placeholder is never cached.
    assert!(!router.cache().unwrap().contains(&request));
}

#[tokio::test]
async fn execute_reports_exhaustion_as_error() {
    let router = Huginn::builder()
        .provider(generalist(), Failing::new())
        .without_cache()
        .build()
        .unwrap();

    let err = router.execute(&lineup_request()).await.unwrap_err();
    assert!(matches!(err, HuginnError::AllProvidersExhausted));
}

#[tokio::test]
async fn fallback_is_one_level_deep() {
    let failing = Failing::new();
    let router = Huginn::builder()
        .provider(generalist(), failing.clone())
        .failure_threshold(10)
        .build()
        .unwrap();

    router.submit(&lineup_request()).await;
    // One primary attempt plus one degraded attempt, no more.
    assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Exact hit
// ============================================================================

#[tokio::test]
async fn exact_hit_skips_providers_and_counts_savings() {
    let client = Answering::new("unused");
    let router = Huginn::builder()
        .provider(analyst(), client.clone())
        .build()
        .unwrap();

    let request = lineup_request();
    let stored = CompletionResponse {
        content: "Start Allen at QB.".into(),
        provider: "analyst".into(),
        tokens_used: 200,
        cost: 0.02,
        latency: Duration::from_millis(850),
        cached: false,
        confidence: 88,
        created_at: Utc::now(),
    };
    let cache = router.cache().unwrap();
    assert!(cache.store(&request, &stored));

    let outcome = router.submit(&request).await;
    assert!(outcome.is_answered());
    let response = outcome.into_response();
    assert!(response.cached);
    assert_eq!(response.cost, 0.02);
    assert_eq!(response.content, stored.content);
    assert_eq!(response.provider, stored.provider);

    assert!((cache.analytics().cost_saved - 0.02).abs() < 1e-12);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answered_response_is_cached_for_next_caller() {
    let client = Answering::new("Bench the kicker.");
    let router = Huginn::builder()
        .provider(analyst(), client.clone())
        .build()
        .unwrap();

    let request = lineup_request();
    let first = router.submit(&request).await;
    let second = router.submit(&request).await;

    assert!(matches!(&first, Outcome::Answered(r) if !r.cached));
    assert!(matches!(&second, Outcome::Answered(r) if r.cached));
    assert_eq!(first.response().content, second.response().content);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}
