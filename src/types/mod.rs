//! Public types for the Huginn API.

mod capability;
mod message;
mod provider;
mod request;
mod response;

pub use capability::{Capability, Complexity, Priority};
pub use message::{Message, Role};
pub use provider::{ProviderProfile, RateLimit};
pub use request::{
    CompletionRequest, CompletionRequestBuilder, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    DEGRADED_MAX_TOKENS,
};
pub use response::{CompletionResponse, Outcome, UNAVAILABLE_PROVIDER};
