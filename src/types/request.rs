//! Completion request value object

use std::time::Duration;

use super::capability::{Capability, Complexity, Priority};
use super::message::{Message, Role};
use crate::{HuginnError, Result};

/// Output token cap used when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Sampling temperature used when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Output token cap applied to a degraded fallback request.
pub const DEGRADED_MAX_TOKENS: u32 = 500;

/// A caller-supplied completion request.
///
/// Built through [`CompletionRequest::builder()`] (validated) or
/// [`CompletionRequest::prompt()`]. Fields are read-only once built;
/// [`degraded()`](Self::degraded) derives a new request rather than
/// mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    messages: Vec<Message>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    capabilities: Vec<Capability>,
    complexity: Complexity,
    priority: Priority,
    cost_budget_cents: Option<f64>,
    timeout: Option<Duration>,
    caller: Option<String>,
    context: Option<serde_json::Value>,
}

impl CompletionRequest {
    /// Start building a request.
    pub fn builder() -> CompletionRequestBuilder {
        CompletionRequestBuilder::default()
    }

    /// Single user turn asking for domain analysis at moderate complexity
    /// and medium priority.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(text)],
            max_tokens: None,
            temperature: None,
            capabilities: vec![Capability::DomainAnalysis],
            complexity: Complexity::Moderate,
            priority: Priority::Medium,
            cost_budget_cents: None,
            timeout: None,
            caller: None,
            context: None,
        }
    }

    /// Simplified copy used for the single fallback attempt: complexity is
    /// forced to simple, capabilities shrink to general chat, and the output
    /// cap is lowered to [`DEGRADED_MAX_TOKENS`].
    pub fn degraded(&self) -> Self {
        Self {
            complexity: Complexity::Simple,
            capabilities: vec![Capability::GeneralChat],
            max_tokens: Some(self.max_tokens().min(DEGRADED_MAX_TOKENS)),
            ..self.clone()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Effective output token cap.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Effective sampling temperature.
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Required capabilities, sorted and deduplicated.
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn requires(&self, capability: Capability) -> bool {
        self.capabilities.binary_search(&capability).is_ok()
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Hard cost budget in cents, if any.
    pub fn cost_budget_cents(&self) -> Option<f64> {
        self.cost_budget_cents
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    pub fn context(&self) -> Option<&serde_json::Value> {
        self.context.as_ref()
    }

    /// Text of all user-authored turns, space separated.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Estimated total tokens: every message's estimate plus the output cap.
    pub fn estimated_tokens(&self) -> u64 {
        self.messages
            .iter()
            .map(Message::estimated_tokens)
            .sum::<u64>()
            + u64::from(self.max_tokens())
    }
}

/// Builder for [`CompletionRequest`].
#[derive(Debug, Default)]
pub struct CompletionRequestBuilder {
    messages: Vec<Message>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    capabilities: Vec<Capability>,
    complexity: Complexity,
    priority: Priority,
    cost_budget_cents: Option<f64>,
    timeout: Option<Duration>,
    caller: Option<String>,
    context: Option<serde_json::Value>,
}

impl CompletionRequestBuilder {
    /// Append a message turn.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append several message turns in order.
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Hard cost budget in cents.
    pub fn cost_budget_cents(mut self, cents: f64) -> Self {
        self.cost_budget_cents = Some(cents);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Caller identity, used to partition and invalidate cache entries.
    pub fn caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Free-form context payload.
    pub fn context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Validate and build the request.
    pub fn build(mut self) -> Result<CompletionRequest> {
        if self.messages.is_empty() {
            return Err(HuginnError::InvalidInput(
                "request needs at least one message".into(),
            ));
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(HuginnError::InvalidInput(format!(
                "temperature {t} outside 0.0..=2.0"
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(HuginnError::InvalidInput(
                "max_tokens must be positive".into(),
            ));
        }
        if let Some(b) = self.cost_budget_cents
            && !(b.is_finite() && b >= 0.0)
        {
            return Err(HuginnError::InvalidInput(format!(
                "cost budget {b} must be a non-negative number of cents"
            )));
        }

        self.capabilities.sort();
        self.capabilities.dedup();

        Ok(CompletionRequest {
            messages: self.messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            capabilities: self.capabilities,
            complexity: self.complexity,
            priority: self.priority,
            cost_budget_cents: self.cost_budget_cents,
            timeout: self.timeout,
            caller: self.caller,
            context: self.context,
        })
    }
}
