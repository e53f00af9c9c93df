//! Builder for configuring router instances

use std::sync::Arc;
use std::time::Duration;

use super::Huginn;
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::Config;
use crate::providers::usage::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_LATENCY_ALPHA};
use crate::providers::{CompletionClient, ProviderRegistry, UsageTracker};
use crate::types::ProviderProfile;
use crate::{HuginnError, Result};

/// Routing behaviour shared by every request.
///
/// ```rust
/// # use huginn::RouterConfig;
/// # use std::time::Duration;
/// let config = RouterConfig::new()
///     .failure_threshold(5)
///     .default_timeout(Duration::from_secs(20));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Consecutive failures that open a provider's circuit. Default: 3.
    pub failure_threshold: u32,
    /// Deadline for requests that carry no timeout of their own.
    /// Default: none.
    pub default_timeout: Option<Duration>,
    /// Latency smoothing factor. Default: 0.5.
    pub latency_alpha: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            default_timeout: None,
            latency_alpha: DEFAULT_LATENCY_ALPHA,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn latency_alpha(mut self, alpha: f64) -> Self {
        self.latency_alpha = alpha;
        self
    }
}

/// Builder for [`Huginn`].
///
/// Providers are registered in call order. A profile can be added without a
/// client (it is listed but never selected) and have its client attached
/// later with [`client`](Self::client).
pub struct HuginnBuilder {
    providers: Vec<(ProviderProfile, Option<Arc<dyn CompletionClient>>)>,
    clients: Vec<(String, Arc<dyn CompletionClient>)>,
    router: RouterConfig,
    cache: Option<CacheConfig>,
    sweep_interval: Option<Duration>,
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            clients: Vec::new(),
            router: RouterConfig::default(),
            cache: Some(CacheConfig::default()),
            sweep_interval: None,
        }
    }

    /// Start from a configuration file's catalog, router and cache
    /// settings, including the sweep interval. Clients still have to be
    /// attached.
    pub fn from_config(config: &Config) -> Self {
        Self {
            providers: config.providers.iter().cloned().map(|p| (p, None)).collect(),
            clients: Vec::new(),
            router: config.router.to_router_config(),
            cache: config.cache.to_cache_config(),
            sweep_interval: config.cache.sweep_interval(),
        }
    }

    /// Register a provider together with its client.
    pub fn provider(mut self, profile: ProviderProfile, client: Arc<dyn CompletionClient>) -> Self {
        self.providers.push((profile, Some(client)));
        self
    }

    /// Register provider profiles without clients.
    pub fn catalog(mut self, profiles: impl IntoIterator<Item = ProviderProfile>) -> Self {
        self.providers.extend(profiles.into_iter().map(|p| (p, None)));
        self
    }

    /// Attach a client to a provider registered by name.
    pub fn client(mut self, name: impl Into<String>, client: Arc<dyn CompletionClient>) -> Self {
        self.clients.push((name.into(), client));
        self
    }

    pub fn router(mut self, config: RouterConfig) -> Self {
        self.router = config;
        self
    }

    /// Set default timeout for requests without their own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.router.default_timeout = Some(timeout);
        self
    }

    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.router.failure_threshold = n;
        self
    }

    /// Configure the response cache (enabled by default).
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Route every request to a provider; never cache.
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Run the cache optimization sweep every `interval` once the router is
    /// built with [`build_shared`](Self::build_shared).
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Build the router behind an `Arc`, starting the maintenance sweep when
    /// a sweep interval is set and caching is enabled.
    ///
    /// Starting the sweep needs a current tokio runtime.
    pub fn build_shared(self) -> Result<Arc<Huginn>> {
        let interval = self.sweep_interval;
        let router = Arc::new(self.build()?);
        if let Some(interval) = interval
            && router.cache().is_some()
        {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(HuginnError::Configuration(
                    "cache sweep needs a running tokio runtime".into(),
                ));
            }
            router.spawn_maintenance(interval);
        }
        Ok(router)
    }

    /// Build the router.
    ///
    /// A sweep interval set on the builder is validated but only started by
    /// [`build_shared`](Self::build_shared).
    pub fn build(self) -> Result<Huginn> {
        if self.providers.is_empty() {
            return Err(HuginnError::Configuration(
                "at least one provider must be registered".into(),
            ));
        }
        if self.router.failure_threshold == 0 {
            return Err(HuginnError::Configuration(
                "failure threshold must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.router.latency_alpha) {
            return Err(HuginnError::Configuration(format!(
                "latency alpha {} outside 0.0..=1.0",
                self.router.latency_alpha
            )));
        }

        if self.sweep_interval.is_some_and(|i| i.is_zero()) {
            return Err(HuginnError::Configuration(
                "cache sweep interval must be positive".into(),
            ));
        }

        let mut registry = ProviderRegistry::new();
        for (profile, client) in self.providers {
            match client {
                Some(client) => registry.register(profile, client)?,
                None => registry.register_profile(profile)?,
            }
        }
        for (name, client) in self.clients {
            registry.attach(&name, client)?;
        }

        let usage = UsageTracker::new(self.router.failure_threshold, self.router.latency_alpha);
        let cache = self.cache.map(ResponseCache::new).transpose()?;

        Ok(Huginn::new(registry, usage, cache, self.router))
    }
}
