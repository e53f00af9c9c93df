//! Response and outcome types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider name carried by the unavailable placeholder.
pub const UNAVAILABLE_PROVIDER: &str = "fallback";

const UNAVAILABLE_MESSAGE: &str = "I apologize, but I'm currently experiencing technical \
     difficulties. Please try again in a moment.";

/// A completed (or cached) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Name of the provider that produced the content.
    pub provider: String,
    pub tokens_used: u32,
    /// Actual cost in USD.
    pub cost: f64,
    pub latency: Duration,
    pub cached: bool,
    /// Derived confidence, 0–100.
    pub confidence: u8,
    pub created_at: DateTime<Utc>,
}

impl CompletionResponse {
    /// The neutral "service is busy" answer returned when every attempt
    /// failed: zero cost, zero confidence, never cached.
    pub fn unavailable(latency: Duration) -> Self {
        Self {
            content: UNAVAILABLE_MESSAGE.to_string(),
            provider: UNAVAILABLE_PROVIDER.to_string(),
            tokens_used: 0,
            cost: 0.0,
            latency,
            cached: false,
            confidence: 0,
            created_at: Utc::now(),
        }
    }

    /// Whether this is the unavailable placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.confidence == 0 && self.cost == 0.0 && self.provider == UNAVAILABLE_PROVIDER
    }
}

/// Result of [`Huginn::submit`](crate::Huginn::submit).
///
/// Callers that only want text can use [`Outcome::into_response`]; callers
/// that must tell a real answer from a placeholder match on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Served by the primary provider or the cache.
    Answered(CompletionResponse),
    /// Served by the degraded fallback attempt.
    Degraded(CompletionResponse),
    /// Every attempt failed; carries the placeholder response.
    Unavailable(CompletionResponse),
}

impl Outcome {
    pub fn response(&self) -> &CompletionResponse {
        match self {
            Outcome::Answered(r) | Outcome::Degraded(r) | Outcome::Unavailable(r) => r,
        }
    }

    pub fn into_response(self) -> CompletionResponse {
        match self {
            Outcome::Answered(r) | Outcome::Degraded(r) | Outcome::Unavailable(r) => r,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Outcome::Unavailable(_))
    }
}
