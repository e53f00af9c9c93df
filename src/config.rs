//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (e.g. a `--config <path>` flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Every section is optional. A file without `[[providers]]` keeps the
//! built-in catalog; a file with any `[[providers]]` replaces it entirely.
//!
//! ```toml
//! [router]
//! failure_threshold = 3
//! timeout_secs = 20
//!
//! [cache]
//! max_entries = 5000
//! long_ttl_secs = 43200
//! keywords = ["lineup", "trade", "waiver"]
//!
//! [[providers]]
//! name = "deepseek"
//! cost_per_token = 0.000001
//! request_cost = 0.01
//! max_tokens = 4096
//! strengths = ["general_chat", "domain_analysis"]
//! affinity = ["simple"]
//! latency_ms = 800
//! reliability = 0.92
//! rate_limit = { requests_per_minute = 100, tokens_per_minute = 100000 }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::cache::fingerprint::DEFAULT_KEYWORDS;
use crate::cache::response::{
    DEFAULT_LONG_TTL, DEFAULT_MAX_ENTRIES, DEFAULT_MEDIUM_TTL, DEFAULT_SEMANTIC_THRESHOLD,
    DEFAULT_SHORT_TTL,
};
use crate::gateway::RouterConfig;
use crate::providers::default_catalog;
use crate::providers::usage::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_LATENCY_ALPHA};
use crate::types::ProviderProfile;
use crate::{HuginnError, Result};

/// Router configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default = "default_catalog")]
    pub providers: Vec<ProviderProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            router: RouterSection::default(),
            cache: CacheSection::default(),
            providers: default_catalog(),
        }
    }
}

/// `[router]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    /// Consecutive failures that open a circuit (default: 3).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Deadline applied to requests without their own timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Latency smoothing factor, 0.0–1.0 (default: 0.5).
    #[serde(default = "default_latency_alpha")]
    pub latency_alpha: f64,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            timeout_secs: None,
            latency_alpha: default_latency_alpha(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_latency_alpha() -> f64 {
    DEFAULT_LATENCY_ALPHA
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_short_ttl")]
    pub short_ttl_secs: u64,
    #[serde(default = "default_medium_ttl")]
    pub medium_ttl_secs: u64,
    #[serde(default = "default_long_ttl")]
    pub long_ttl_secs: u64,
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Run the optimization sweep this often (seconds). Off when unset.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            short_ttl_secs: default_short_ttl(),
            medium_ttl_secs: default_medium_ttl(),
            long_ttl_secs: default_long_ttl(),
            semantic_threshold: default_semantic_threshold(),
            keywords: default_keywords(),
            sweep_interval_secs: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

fn default_short_ttl() -> u64 {
    DEFAULT_SHORT_TTL.as_secs()
}

fn default_medium_ttl() -> u64 {
    DEFAULT_MEDIUM_TTL.as_secs()
}

fn default_long_ttl() -> u64 {
    DEFAULT_LONG_TTL.as_secs()
}

fn default_semantic_threshold() -> f64 {
    DEFAULT_SEMANTIC_THRESHOLD
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

impl RouterSection {
    pub fn to_router_config(&self) -> RouterConfig {
        RouterConfig {
            failure_threshold: self.failure_threshold,
            default_timeout: self.timeout_secs.map(Duration::from_secs),
            latency_alpha: self.latency_alpha,
        }
    }
}

impl CacheSection {
    /// Runtime cache configuration, or `None` when the cache is disabled.
    pub fn to_cache_config(&self) -> Option<CacheConfig> {
        self.enabled.then(|| {
            CacheConfig::new()
                .max_entries(self.max_entries)
                .short_ttl(Duration::from_secs(self.short_ttl_secs))
                .medium_ttl(Duration::from_secs(self.medium_ttl_secs))
                .long_ttl(Duration::from_secs(self.long_ttl_secs))
                .semantic_threshold(self.semantic_threshold)
                .keywords(self.keywords.iter().cloned())
        })
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to [`Config::default`] when
    /// no file exists in the standard locations. An explicit path must exist.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match explicit_path {
            Some(path) => Self::load(Some(path)),
            None => match Self::standard_path() {
                Some(path) => Self::load_from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.router.latency_alpha) {
            return Err(HuginnError::Configuration(format!(
                "router.latency_alpha {} outside 0.0..=1.0",
                self.router.latency_alpha
            )));
        }
        if self.router.failure_threshold == 0 {
            return Err(HuginnError::Configuration(
                "router.failure_threshold must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cache.semantic_threshold) {
            return Err(HuginnError::Configuration(format!(
                "cache.semantic_threshold {} outside 0.0..=1.0",
                self.cache.semantic_threshold
            )));
        }
        if self.cache.sweep_interval_secs == Some(0) {
            return Err(HuginnError::Configuration(
                "cache.sweep_interval_secs must be positive".into(),
            ));
        }
        for provider in &self.providers {
            provider.validate()?;
        }
        Ok(())
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Self::standard_path().ok_or_else(|| {
            HuginnError::Configuration(
                "No config file found. Create ~/.huginn/config.toml or /etc/huginn/config.toml"
                    .to_string(),
            )
        })
    }

    fn standard_path() -> Option<PathBuf> {
        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        system_config.exists().then_some(system_config)
    }
}
