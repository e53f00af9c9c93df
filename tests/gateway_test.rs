//! Integration tests for the router facade: construction, usage reporting,
//! administration, and background maintenance.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use huginn::{
    CacheConfig, Capability, Complexity, Completion, CompletionClient, CompletionRequest, Huginn,
    HuginnError, Message, ProviderProfile, RateLimit, Result, RouterConfig,
};

// ============================================================================
// Mock client
// ============================================================================

struct Scripted {
    reply: &'static str,
    tokens: u32,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(reply: &'static str, tokens: u32) -> Arc<Self> {
        Arc::new(Self {
            reply,
            tokens,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionClient for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _provider: &ProviderProfile,
        _messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(Completion::new(self.reply, self.tokens))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn profile(name: &str) -> ProviderProfile {
    ProviderProfile {
        name: name.into(),
        cost_per_token: 0.000_1,
        request_cost: 0.001,
        max_tokens: 4096,
        strengths: vec![Capability::GeneralChat, Capability::DomainAnalysis],
        affinity: vec![Complexity::Simple, Complexity::Moderate],
        rate_limit: RateLimit {
            requests_per_minute: 1000,
            tokens_per_minute: 1_000_000,
        },
        latency_ms: 600,
        reliability: 0.9,
    }
}

fn chat(text: &str) -> CompletionRequest {
    CompletionRequest::builder()
        .message(Message::user(text))
        .capability(Capability::GeneralChat)
        .build()
        .unwrap()
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn build_requires_a_provider() {
    let err = Huginn::builder().build().unwrap_err();
    assert!(matches!(err, HuginnError::Configuration(_)));
}

#[test]
fn build_validates_router_settings() {
    let zero = Huginn::builder()
        .provider(profile("p"), Scripted::new("x", 1))
        .failure_threshold(0)
        .build();
    assert!(zero.is_err());

    let alpha = Huginn::builder()
        .provider(profile("p"), Scripted::new("x", 1))
        .router(RouterConfig::new().latency_alpha(1.5))
        .build();
    assert!(alpha.is_err());

    let threshold = Huginn::builder()
        .provider(profile("p"), Scripted::new("x", 1))
        .cache(CacheConfig::new().semantic_threshold(-0.1))
        .build();
    assert!(threshold.is_err());
}

#[test]
fn build_rejects_invalid_profile() {
    let mut bad = profile("p");
    bad.reliability = 2.0;
    let err = Huginn::builder()
        .provider(bad, Scripted::new("x", 1))
        .build()
        .unwrap_err();
    assert!(matches!(err, HuginnError::Configuration(_)));
}

#[test]
fn without_cache_disables_caching() {
    let router = Huginn::builder()
        .provider(profile("p"), Scripted::new("x", 1))
        .without_cache()
        .build()
        .unwrap();
    assert!(router.cache().is_none());
}

// ============================================================================
// Responses and usage
// ============================================================================

#[tokio::test]
async fn answered_response_carries_cost_and_confidence() {
    let router = Huginn::builder()
        .provider(profile("p"), Scripted::new("Start your studs.", 200))
        .build()
        .unwrap();

    let outcome = router.submit(&chat("who do I start")).await;
    let response = outcome.response();
    assert_eq!(response.provider, "p");
    assert_eq!(response.tokens_used, 200);
    // 0.001 + 200 * 0.0001
    assert!((response.cost - 0.021).abs() < 1e-12);
    // 17 chars -> 5.1 length points, 0.9 reliability -> 63 points
    assert_eq!(response.confidence, 68);
    assert!(!response.cached);
}

#[tokio::test]
async fn usage_report_aggregates_calls() {
    let router = Huginn::builder()
        .provider(profile("p"), Scripted::new("answer", 100))
        .without_cache()
        .build()
        .unwrap();

    router.submit(&chat("one")).await;
    router.submit(&chat("two")).await;

    let report = router.usage_report();
    assert_eq!(report.total_requests, 2);
    assert!((report.total_cost - 2.0 * 0.011).abs() < 1e-12);
    assert!(report.mean_latency.is_some());

    let snap = &report.providers[0];
    assert_eq!(snap.provider, "p");
    assert_eq!(snap.tokens, 200);
    assert_eq!(snap.requests_last_minute, 2);
    assert!(snap.cost_efficiency() > 0.0);

    router.reset_usage();
    let cleared = router.usage_report();
    assert_eq!(cleared.total_requests, 0);
    assert!(cleared.providers.is_empty());
}

#[tokio::test]
async fn empty_completion_counts_as_failure() {
    let router = Huginn::builder()
        .provider(profile("p"), Scripted::new("   ", 3))
        .without_cache()
        .build()
        .unwrap();

    let outcome = router.submit(&chat("hello")).await;
    assert!(outcome.is_unavailable());
    assert_eq!(router.usage().consecutive_failures("p"), 2);

    let err = router.execute(&chat("hello")).await.unwrap_err();
    assert_eq!(err.kind(), "exhausted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_share_state() {
    let client = Scripted::new("parallel answer", 10);
    let router = Arc::new(
        Huginn::builder()
            .provider(profile("p"), client.clone())
            .build()
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            router.submit(&chat(&format!("question {i}"))).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_answered());
    }

    assert_eq!(client.calls.load(Ordering::SeqCst), 16);
    assert_eq!(router.usage().snapshot("p").unwrap().requests, 16);
    assert_eq!(router.cache().unwrap().len(), 16);
}

// ============================================================================
// Maintenance
// ============================================================================

#[tokio::test(start_paused = true)]
async fn maintenance_task_stops_when_router_is_dropped() {
    let router = Arc::new(
        Huginn::builder()
            .provider(profile("p"), Scripted::new("kept", 10))
            .build()
            .unwrap(),
    );
    router.submit(&chat("fresh entry")).await;

    let interval = Duration::from_secs(60);
    let handle = router.spawn_maintenance(interval);

    // Fresh entries survive the sweep.
    tokio::time::advance(interval * 3).await;
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());
    assert_eq!(router.cache().unwrap().len(), 1);

    drop(router);
    tokio::time::advance(interval).await;
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("maintenance task should exit")
        .unwrap();
}
