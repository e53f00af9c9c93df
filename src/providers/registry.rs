//! Provider registry.
//!
//! The `ProviderRegistry` stores provider profiles in registration order,
//! each optionally paired with the [`CompletionClient`] that executes calls
//! against it. It answers one routing question: which providers may serve a
//! given request right now.
//!
//! # Eligibility
//!
//! A provider is eligible when all of the following hold:
//! - its strengths are a superset of the request's required capabilities
//! - it has an active completion client
//! - its circuit breaker is closed
//!
//! ```text
//!   registered profiles
//!          │
//!          ▼  supports_all(request.capabilities)
//!   capable profiles
//!          │
//!          ▼  client attached?
//!   executable profiles
//!          │
//!          ▼  UsageTracker::is_open?
//!   eligible profiles ──► Selector
//! ```
//!
//! Profiles are immutable once registered and shared as `Arc`s, so the
//! selector and engine never copy them.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::traits::CompletionClient;
use super::usage::UsageTracker;
use crate::types::{CompletionRequest, ProviderProfile};
use crate::{HuginnError, Result};

struct Entry {
    profile: Arc<ProviderProfile>,
    client: Option<Arc<dyn CompletionClient>>,
}

/// Registry of provider profiles and their completion clients.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<Entry>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| {
                (
                    e.profile.name.as_str(),
                    e.client.as_ref().map(|c| c.name().to_string()),
                )
            }))
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider together with its client.
    ///
    /// Registering a name twice replaces the earlier entry in place.
    pub fn register(
        &mut self,
        profile: ProviderProfile,
        client: Arc<dyn CompletionClient>,
    ) -> Result<()> {
        self.insert(profile, Some(client))
    }

    /// Register a profile with no client. It is listed but never eligible
    /// until [`attach`](Self::attach) supplies one.
    pub fn register_profile(&mut self, profile: ProviderProfile) -> Result<()> {
        self.insert(profile, None)
    }

    /// Attach (or replace) the client of an already registered provider.
    pub fn attach(&mut self, name: &str, client: Arc<dyn CompletionClient>) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.profile.name == name)
            .ok_or_else(|| HuginnError::Configuration(format!("unknown provider '{name}'")))?;
        entry.client = Some(client);
        Ok(())
    }

    fn insert(
        &mut self,
        profile: ProviderProfile,
        client: Option<Arc<dyn CompletionClient>>,
    ) -> Result<()> {
        profile.validate()?;
        let entry = Entry {
            profile: Arc::new(profile),
            client,
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.profile.name == entry.profile.name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProviderProfile>> {
        self.entries
            .iter()
            .find(|e| e.profile.name == name)
            .map(|e| Arc::clone(&e.profile))
    }

    /// Active client of a provider, if any.
    pub fn client(&self, name: &str) -> Option<Arc<dyn CompletionClient>> {
        self.entries
            .iter()
            .find(|e| e.profile.name == name)
            .and_then(|e| e.client.clone())
    }

    /// All registered profiles in registration order.
    pub fn profiles(&self) -> impl Iterator<Item = &Arc<ProviderProfile>> {
        self.entries.iter().map(|e| &e.profile)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.profile.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Providers that may serve `request` right now, in registration order.
    ///
    /// Reads the tracker's breaker state but never mutates anything.
    pub fn list_eligible(
        &self,
        request: &CompletionRequest,
        usage: &UsageTracker,
    ) -> Vec<Arc<ProviderProfile>> {
        self.entries
            .iter()
            .filter(|e| {
                let name = e.profile.name.as_str();
                if !e.profile.supports_all(request.capabilities()) {
                    return false;
                }
                if e.client.is_none() {
                    debug!(provider = name, "skipping provider without client");
                    return false;
                }
                if usage.is_open(name) {
                    debug!(provider = name, "skipping provider with open circuit");
                    return false;
                }
                true
            })
            .map(|e| Arc::clone(&e.profile))
            .collect()
    }
}
