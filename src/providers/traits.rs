//! Completion client trait.
//!
//! Each registered provider is backed by a [`CompletionClient`] that turns
//! message turns into text. The wire protocol is the client's business; the
//! router only sees text, a token count, and errors.
//!
//! # Error semantics
//!
//! Any `Err` returned by [`CompletionClient::complete`] is a provider-level
//! failure: it is recorded against that provider's circuit breaker and
//! triggers the degraded fallback attempt. Clients should map transport and
//! quota failures onto the closest [`HuginnError`](crate::HuginnError)
//! variant (`Http`, `Api`, `RateLimited`, ...).
//!
//! # Example
//!
//! ```ignore
//! struct Echo;
//!
//! #[async_trait]
//! impl CompletionClient for Echo {
//!     fn name(&self) -> &str { "echo" }
//!
//!     async fn complete(&self, _p: &ProviderProfile, messages: &[Message], _max: u32, _t: f32)
//!         -> Result<Completion>
//!     {
//!         let text = messages.last().map(|m| m.content.clone()).unwrap_or_default();
//!         Ok(Completion { tokens_used: text.len() as u32, text })
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::{Message, ProviderProfile};

/// Raw output of a provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Tokens actually consumed (prompt + completion).
    pub tokens_used: u32,
}

impl Completion {
    pub fn new(text: impl Into<String>, tokens_used: u32) -> Self {
        Self {
            text: text.into(),
            tokens_used,
        }
    }
}

/// Provider for text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Client name for logging/debugging.
    fn name(&self) -> &str;

    /// Complete `messages` with the given output cap and temperature.
    async fn complete(
        &self,
        provider: &ProviderProfile,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion>;
}
