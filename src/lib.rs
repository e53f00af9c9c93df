//! Huginn - cost-aware routing and caching for AI completion providers
//!
//! Huginn picks, per request, the completion provider that best balances
//! cost, latency, reliability, and capability fit. Failing providers are
//! benched by a circuit breaker, failed requests get one degraded retry,
//! and answers are cached by exact fingerprint and (for analysis-heavy
//! requests) by keyword similarity.
//!
//! The wire protocol of each provider is left to a [`CompletionClient`]
//! implementation supplied by the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use huginn::{Huginn, CompletionRequest, Outcome, default_catalog};
//! # use huginn::{Completion, CompletionClient, Message, ProviderProfile};
//! # struct MyClient;
//! # #[async_trait::async_trait]
//! # impl CompletionClient for MyClient {
//! #     fn name(&self) -> &str { "mine" }
//! #     async fn complete(&self, _: &ProviderProfile, _: &[Message], _: u32, _: f32)
//! #         -> huginn::Result<Completion> { Ok(Completion::new("ok", 1)) }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let router = Huginn::builder()
//!         .catalog(default_catalog())
//!         .client("deepseek", Arc::new(MyClient))
//!         .build()?;
//!
//!     let request = CompletionRequest::prompt("Who should I start at flex this week?");
//!     match router.submit(&request).await {
//!         Outcome::Answered(r) | Outcome::Degraded(r) => println!("{}", r.content),
//!         Outcome::Unavailable(r) => eprintln!("busy: {}", r.content),
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{
    CacheAnalytics, CacheConfig, HealthReport, HealthStatus, InvalidationFilter, ResponseCache,
    SweepReport,
};
pub use config::Config;
pub use error::{HuginnError, Result};
pub use gateway::{Huginn, HuginnBuilder, RouterConfig, WarmReport};
pub use providers::{
    CircuitState, Completion, CompletionClient, ProviderRegistry, RankedProvider, ScoreBreakdown,
    UsageReport, UsageSnapshot, UsageTracker, default_catalog,
};

// Re-export all types
pub use types::{
    Capability, Complexity, CompletionRequest, CompletionRequestBuilder, CompletionResponse,
    Message, Outcome, Priority, ProviderProfile, RateLimit, Role,
};
