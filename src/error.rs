//! Huginn error types

use std::time::Duration;

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Provider/transport errors, raised by completion clients
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("empty response from provider")]
    EmptyResponse,

    #[error("provider '{provider}' did not answer within {after:?}")]
    Timeout { provider: String, after: Duration },

    // Routing errors
    /// No registered provider satisfies the request's capabilities, budget,
    /// and circuit-breaker constraints.
    #[error("no suitable provider available")]
    NoEligibleProvider,

    #[error("provider '{provider}' failed: {message}")]
    ProviderCallFailed { provider: String, message: String },

    /// Both the primary and the degraded attempt failed. Never surfaced by
    /// [`Huginn::submit`](crate::Huginn::submit); it is mapped to
    /// [`Outcome::Unavailable`](crate::Outcome::Unavailable).
    #[error("all providers exhausted")]
    AllProvidersExhausted,

    // Cache errors (always treated as a miss)
    #[error("cache inconsistency: {0}")]
    CacheInconsistency(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Short stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            HuginnError::Http(_) => "http",
            HuginnError::Api { .. } => "api",
            HuginnError::RateLimited { .. } => "rate_limited",
            HuginnError::AuthenticationFailed => "auth",
            HuginnError::ContentFiltered { .. } => "content_filtered",
            HuginnError::EmptyResponse => "empty_response",
            HuginnError::Timeout { .. } => "timeout",
            HuginnError::NoEligibleProvider => "no_eligible_provider",
            HuginnError::ProviderCallFailed { .. } => "provider_call_failed",
            HuginnError::AllProvidersExhausted => "exhausted",
            HuginnError::CacheInconsistency(_) => "cache_inconsistency",
            HuginnError::Json(_) => "json",
            HuginnError::InvalidInput(_) => "invalid_input",
            HuginnError::Configuration(_) => "configuration",
        }
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
