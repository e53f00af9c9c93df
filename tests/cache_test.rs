//! Integration tests for the response cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use huginn::cache::{HitKind, fingerprint};
use huginn::{
    CacheConfig, Capability, Complexity, Completion, CompletionClient, CompletionRequest,
    CompletionResponse, HealthStatus, Huginn, InvalidationFilter, Message, ProviderProfile,
    RateLimit, ResponseCache, Result,
};

// ============================================================================
// Helpers
// ============================================================================

fn response(content: &str, cost: f64) -> CompletionResponse {
    CompletionResponse {
        content: content.into(),
        provider: "p".into(),
        tokens_used: 100,
        cost,
        latency: Duration::from_millis(400),
        cached: false,
        confidence: 80,
        created_at: Utc::now(),
    }
}

fn analysis(text: &str) -> CompletionRequest {
    CompletionRequest::builder()
        .message(Message::user(text))
        .capability(Capability::DomainAnalysis)
        .build()
        .unwrap()
}

fn chat(text: &str) -> CompletionRequest {
    CompletionRequest::builder()
        .message(Message::user(text))
        .capability(Capability::GeneralChat)
        .build()
        .unwrap()
}

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionClient for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn complete(
        &self,
        _provider: &ProviderProfile,
        _messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<Completion> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion::new(format!("answer #{n}"), 50))
    }
}

fn profile() -> ProviderProfile {
    ProviderProfile {
        name: "p".into(),
        cost_per_token: 0.0001,
        request_cost: 0.0,
        max_tokens: 4096,
        strengths: vec![
            Capability::GeneralChat,
            Capability::DomainAnalysis,
            Capability::ComplexReasoning,
        ],
        affinity: vec![],
        rate_limit: RateLimit {
            requests_per_minute: 1000,
            tokens_per_minute: 1_000_000,
        },
        latency_ms: 500,
        reliability: 0.9,
    }
}

// ============================================================================
// Fingerprint determinism
// ============================================================================

#[test]
fn identical_requests_share_a_fingerprint() {
    let build = |caps: [Capability; 2]| {
        CompletionRequest::builder()
            .message(Message::system("You are a fantasy football analyst."))
            .message(Message::user("Who do I start at flex?"))
            .capabilities(caps)
            .complexity(Complexity::Complex)
            .temperature(0.3)
            .caller("user-7")
            .build()
            .unwrap()
    };
    let a = build([Capability::DomainAnalysis, Capability::ComplexReasoning]);
    let b = build([Capability::ComplexReasoning, Capability::DomainAnalysis]);
    assert_eq!(fingerprint(&a), fingerprint(&b));
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn store_then_lookup_round_trips() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    let request = chat("how are you");
    let stored = response("fine, thanks", 0.013);
    cache.store(&request, &stored);

    let before = cache.analytics().cost_saved;
    let hit = cache.lookup(&request).unwrap();
    assert_eq!(hit.content, stored.content);
    assert_eq!(hit.cost, stored.cost);
    assert_eq!(hit.provider, stored.provider);
    assert!(hit.cached);
    assert!((cache.analytics().cost_saved - before - 0.013).abs() < 1e-12);
}

// ============================================================================
// Semantic lookup
// ============================================================================

#[test]
fn similarity_exactly_at_threshold_matches() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    // {draft, injury, lineup, matchup, player}
    cache.store(
        &analysis("draft injury lineup matchup player"),
        &response("cached analysis", 0.01),
    );

    // {draft, injury, lineup, matchup}: 4 / 5 = 0.8
    let hit = cache.lookup(&analysis("Given the injury, redo my draft lineup for this matchup"));
    assert!(hit.is_some());
}

#[test]
fn similarity_below_threshold_misses() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    cache.store(
        &analysis("draft injury lineup matchup player"),
        &response("cached analysis", 0.01),
    );
    // {draft, injury, lineup, waiver}: 3 / 6 = 0.5
    assert!(cache.lookup(&analysis("draft injury lineup waiver")).is_none());
    assert_eq!(cache.analytics().misses, 1);
}

#[test]
fn best_semantic_match_wins() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    cache.store(
        &analysis("lineup trade waiver draft player"),
        &response("four of five", 0.01),
    );
    cache.store(&analysis("lineup trade waiver draft"), &response("exact set", 0.01));

    let hit = cache
        .lookup(&analysis("trade lineup waiver draft advice please"))
        .unwrap();
    assert_eq!(hit.content, "exact set");
    assert_eq!(hit.confidence, 80);
}

#[test]
fn complex_requests_use_semantic_lookup_without_domain_capability() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    let complex = |text: &str| {
        CompletionRequest::builder()
            .message(Message::user(text))
            .capability(Capability::ComplexReasoning)
            .complexity(Complexity::Complex)
            .build()
            .unwrap()
    };
    cache.store(&complex("trade player"), &response("yes", 0.01));
    assert!(cache.lookup(&complex("player trade?")).is_some());
    assert_eq!(cache.analytics().semantic_hits, 1);
    assert_eq!(HitKind::Semantic.as_str(), "semantic");
}

#[test]
fn custom_vocabulary_and_threshold() {
    let cache = ResponseCache::new(
        CacheConfig::new()
            .keywords(["borrow", "lifetime", "trait"])
            .semantic_threshold(0.5),
    )
    .unwrap();
    cache.store(&analysis("borrow lifetime"), &response("use references", 0.01));
    // {borrow, trait} vs {borrow, lifetime}: 1 / 3 < 0.5
    assert!(cache.lookup(&analysis("borrow trait")).is_none());
    // {borrow} vs {borrow, lifetime}: 1 / 2 = 0.5
    let hit = cache.lookup(&analysis("borrowing rules")).unwrap();
    assert_eq!(hit.confidence, 40);
}

// ============================================================================
// Invalidation and sweep
// ============================================================================

#[test]
fn invalidate_by_caller_and_context() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    let with = |caller: &str, league: u32| {
        CompletionRequest::builder()
            .message(Message::user(format!("{caller} {league}")))
            .caller(caller)
            .context(json!({ "league": league }))
            .build()
            .unwrap()
    };
    cache.store(&with("ann", 1), &response("a", 0.01));
    cache.store(&with("ann", 2), &response("b", 0.01));
    cache.store(&with("ben", 2), &response("c", 0.01));
    cache.store(&with("cid", 3), &response("d", 0.01));

    assert_eq!(cache.invalidate(&InvalidationFilter::new().caller("ann")), 2);
    assert_eq!(
        cache.invalidate(&InvalidationFilter::new().context(&json!({ "league": 2 }))),
        1
    );
    assert_eq!(cache.len(), 1);
}

#[test]
fn sweep_reports_forfeited_savings() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    let once = chat("asked once");
    cache.store(&once, &response("x", 0.04));
    cache.lookup(&once);

    let report = cache.optimize_at(Utc::now() + chrono::Duration::days(8));
    assert_eq!(report.removed, 1);
    assert!((report.cost_forfeited - 0.04).abs() < 1e-12);
    assert!(cache.is_empty());
}

// ============================================================================
// Analytics and health
// ============================================================================

#[test]
fn analytics_rank_popular_entries() {
    let cache = ResponseCache::new(CacheConfig::default()).unwrap();
    let hot = chat("hot");
    let cold = chat("cold");
    cache.store(&hot, &response("h", 0.01));
    cache.store(&cold, &response("c", 0.01));
    for _ in 0..3 {
        cache.lookup(&hot);
    }
    cache.lookup(&cold);
    cache.lookup(&chat("never stored"));

    let stats = cache.analytics();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate - 0.8).abs() < 1e-12);
    assert_eq!(stats.memory_bytes, 2 * 2048);
    assert_eq!(stats.top.len(), 2);
    assert_eq!(stats.top[0].key, fingerprint(&hot));
    assert_eq!(stats.top[0].hits, 3);
    assert_eq!(cache.health().status, HealthStatus::Healthy);
}

// ============================================================================
// Through the router
// ============================================================================

#[tokio::test]
async fn semantic_hit_through_submit() {
    let client = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let router = Huginn::builder()
        .provider(profile(), client.clone())
        .build()
        .unwrap();

    let first = router
        .submit(&analysis("Should I trade for this player before the waiver deadline?"))
        .await;
    let second = router
        .submit(&analysis("Trade this player or hold through waivers?"))
        .await;

    assert!(!first.response().cached);
    assert!(second.response().cached);
    assert_eq!(second.response().content, first.response().content);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn warm_populates_cache() {
    let client = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let router = Huginn::builder()
        .provider(profile(), client.clone())
        .build()
        .unwrap();

    let requests = vec![chat("one"), chat("two"), chat("one")];
    let report = router.warm(&requests).await;
    assert_eq!(report.warmed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    assert!(router.submit(&chat("two")).await.response().cached);
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}
