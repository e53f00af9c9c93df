//! Built-in provider catalog.
//!
//! Profiles for the providers the router ships with. Callers still have to
//! attach a [`CompletionClient`](super::CompletionClient) to each one they
//! want to use; a profile without a client is never eligible.

use crate::types::{Capability, Complexity, ProviderProfile, RateLimit};

use Capability::*;

#[allow(clippy::too_many_arguments)]
fn profile(
    name: &str,
    cost_per_token: f64,
    request_cost: f64,
    max_tokens: u32,
    strengths: &[Capability],
    affinity: &[Complexity],
    rate_limit: (u32, u32),
    latency_ms: u64,
    reliability: f64,
) -> ProviderProfile {
    ProviderProfile {
        name: name.to_string(),
        cost_per_token,
        request_cost,
        max_tokens,
        strengths: strengths.to_vec(),
        affinity: affinity.to_vec(),
        rate_limit: RateLimit {
            requests_per_minute: rate_limit.0,
            tokens_per_minute: rate_limit.1,
        },
        latency_ms,
        reliability,
    }
}

/// The default five-provider catalog.
///
/// Cheap and fast providers are shortlisted for simple requests, the
/// strongest reasoning models for complex and expert ones.
pub fn default_catalog() -> Vec<ProviderProfile> {
    vec![
        profile(
            "deepseek",
            0.000_001,
            0.01,
            4096,
            &[GeneralChat, DomainAnalysis, FastResponse],
            &[Complexity::Simple],
            (100, 100_000),
            800,
            0.92,
        ),
        profile(
            "openai-mini",
            0.000_15,
            0.001,
            16_384,
            &[GeneralChat, DomainAnalysis, ComplexReasoning, FastResponse],
            &[Complexity::Simple, Complexity::Moderate],
            (3000, 200_000),
            1200,
            0.98,
        ),
        profile(
            "openai-4o",
            0.0025,
            0.01,
            128_000,
            &[ComplexReasoning, DomainAnalysis, DataAnalysis, CreativeWriting],
            &[Complexity::Complex, Complexity::Expert],
            (500, 30_000),
            2000,
            0.99,
        ),
        profile(
            "claude-sonnet",
            0.003,
            0.01,
            200_000,
            &[ComplexReasoning, DomainAnalysis, DataAnalysis, CreativeWriting],
            &[Complexity::Complex, Complexity::Expert],
            (50, 40_000),
            3000,
            0.97,
        ),
        profile(
            "gemini-pro",
            0.000_125,
            0.001,
            32_768,
            &[GeneralChat, DomainAnalysis, ComplexReasoning, Mathematical],
            &[Complexity::Moderate],
            (60, 32_000),
            2500,
            0.94,
        ),
    ]
}
