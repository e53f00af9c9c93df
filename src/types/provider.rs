//! Provider catalog entries

use serde::{Deserialize, Serialize};

use super::capability::{Capability, Complexity};
use super::request::CompletionRequest;
use crate::{HuginnError, Result};

/// Upstream rate limits for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u32,
}

/// Cost, latency, capability, and reliability profile of a provider.
///
/// Registered once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Identifying name, also reported in [`CompletionResponse::provider`](crate::CompletionResponse::provider).
    pub name: String,
    /// USD per token.
    pub cost_per_token: f64,
    /// Fixed USD cost per request.
    pub request_cost: f64,
    pub max_tokens: u32,
    /// Capabilities the provider is strong at.
    pub strengths: Vec<Capability>,
    /// Complexity tiers this provider is shortlisted for.
    #[serde(default)]
    pub affinity: Vec<Complexity>,
    pub rate_limit: RateLimit,
    /// Average latency in milliseconds.
    pub latency_ms: u64,
    /// Empirical reliability, 0.0–1.0.
    pub reliability: f64,
}

impl ProviderProfile {
    pub fn strong_at(&self, capability: Capability) -> bool {
        self.strengths.contains(&capability)
    }

    /// Whether every required capability is among this provider's strengths.
    pub fn supports_all(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.strong_at(*c))
    }

    pub fn has_affinity(&self, complexity: Complexity) -> bool {
        self.affinity.contains(&complexity)
    }

    /// Cost in USD of a call consuming `tokens` tokens.
    pub fn cost_for_tokens(&self, tokens: u64) -> f64 {
        self.request_cost + tokens as f64 * self.cost_per_token
    }

    /// Estimated cost in USD of serving `request`.
    pub fn estimate_cost(&self, request: &CompletionRequest) -> f64 {
        self.cost_for_tokens(request.estimated_tokens())
    }

    /// Reject profiles that would make scoring meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HuginnError::Configuration(
                "provider name must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reliability) {
            return Err(HuginnError::Configuration(format!(
                "provider '{}': reliability {} outside 0.0..=1.0",
                self.name, self.reliability
            )));
        }
        if !(self.cost_per_token >= 0.0 && self.request_cost >= 0.0) {
            return Err(HuginnError::Configuration(format!(
                "provider '{}': costs must be non-negative",
                self.name
            )));
        }
        Ok(())
    }
}
