//! Response cache with exact and semantic lookup.
//!
//! [`ResponseCache`] stores provider responses keyed by the request
//! [fingerprint](super::fingerprint::fingerprint). Each entry also carries a
//! keyword signature so complex or domain-analysis requests can reuse an
//! answer to a sufficiently similar earlier request.
//!
//! # Lookup order
//!
//! ```text
//! lookup(request)
//!     │
//!     ├─► exact: entries.get(fingerprint) ──────────────► hit (similarity 1.0)
//!     │
//!     ├─► semantic (complex or domain-analysis only):
//!     │     best jaccard(signature, entry.signature)
//!     │     ≥ threshold ────────────────────────────────► hit (confidence scaled)
//!     │
//!     └─► miss
//! ```
//!
//! # Expiry
//!
//! The backing store is a bounded moka cache with a per-entry TTL chosen at
//! store time (see [`CacheConfig`]). Every read re-arms the entry's TTL, so
//! hot entries persist. Entries leave the cache by TTL expiry, capacity
//! eviction, [`invalidate`](ResponseCache::invalidate), or the
//! [optimization sweep](ResponseCache::optimize).
//!
//! Placeholder responses are never stored.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::sync::Cache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::fingerprint::{KeywordExtractor, context_hash, fingerprint, jaccard};
use crate::telemetry;
use crate::types::{Capability, Complexity, CompletionRequest, CompletionResponse};
use crate::{HuginnError, Result};

pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;
pub const DEFAULT_SHORT_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MEDIUM_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_LONG_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.8;

/// Responses costing at least this much (USD) get the long TTL.
pub const LONG_TTL_COST_USD: f64 = 0.05;

/// Rough per-entry memory estimate used by analytics.
pub const ENTRY_SIZE_ESTIMATE: u64 = 2048;

const TOP_ENTRIES: usize = 10;
const LOW_HIT_RATE: f64 = 0.2;
const HIGH_MEMORY_BYTES: u64 = 100 * 1024 * 1024;
const HIGH_ENTRY_COUNT: u64 = 10_000;

/// Configuration for the response cache.
///
/// ```rust
/// # use huginn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .long_ttl(Duration::from_secs(12 * 3600))
///     .semantic_threshold(0.9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// TTL for cheap, general requests. Default: 30 minutes.
    pub short_ttl: Duration,
    /// TTL for domain-analysis requests. Default: 2 hours.
    pub medium_ttl: Duration,
    /// TTL for expensive or complex/expert requests. Default: 24 hours.
    pub long_ttl: Duration,
    /// Minimum Jaccard similarity for a semantic hit. Default: 0.8.
    pub semantic_threshold: f64,
    /// Vocabulary for semantic signatures.
    pub keywords: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            short_ttl: DEFAULT_SHORT_TTL,
            medium_ttl: DEFAULT_MEDIUM_TTL,
            long_ttl: DEFAULT_LONG_TTL,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            keywords: super::fingerprint::DEFAULT_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn short_ttl(mut self, ttl: Duration) -> Self {
        self.short_ttl = ttl;
        self
    }

    pub fn medium_ttl(mut self, ttl: Duration) -> Self {
        self.medium_ttl = ttl;
        self
    }

    pub fn long_ttl(mut self, ttl: Duration) -> Self {
        self.long_ttl = ttl;
        self
    }

    pub fn semantic_threshold(mut self, threshold: f64) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    /// Replace the keyword vocabulary.
    pub fn keywords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = words.into_iter().map(Into::into).collect();
        self
    }

    /// TTL for a response to `request`.
    pub fn ttl_for(&self, request: &CompletionRequest, response: &CompletionResponse) -> Duration {
        if response.cost >= LONG_TTL_COST_USD
            || matches!(request.complexity(), Complexity::Complex | Complexity::Expert)
        {
            self.long_ttl
        } else if request.requires(Capability::DomainAnalysis) {
            self.medium_ttl
        } else {
            self.short_ttl
        }
    }
}

/// Whether `request` may be served by a semantic match.
pub fn semantic_eligible(request: &CompletionRequest) -> bool {
    request.complexity() == Complexity::Complex || request.requires(Capability::DomainAnalysis)
}

#[derive(Debug)]
struct EntryStats {
    last_access: DateTime<Utc>,
    hits: u64,
    cost_saved: f64,
}

/// A stored response and its bookkeeping.
#[derive(Debug)]
struct CacheEntry {
    response: CompletionResponse,
    fingerprint: String,
    signature: BTreeSet<String>,
    caller: Option<String>,
    context_hash: Option<String>,
    capabilities: Vec<Capability>,
    created_at: DateTime<Utc>,
    ttl: Duration,
    stats: Mutex<EntryStats>,
}

impl CacheEntry {
    /// Reject entries that cannot be served as-is.
    fn validate(&self, key: &str) -> Result<()> {
        if self.fingerprint != key {
            return Err(HuginnError::CacheInconsistency(format!(
                "entry stored under {key} carries fingerprint {}",
                self.fingerprint
            )));
        }
        if self.response.content.is_empty() || self.response.is_placeholder() {
            return Err(HuginnError::CacheInconsistency(format!(
                "entry {key} holds no usable response"
            )));
        }
        Ok(())
    }
}

/// Re-arms an entry's own TTL on create, read, and update.
struct EntryExpiry;

impl Expiry<String, Arc<CacheEntry>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_read(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Which lookup produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Exact,
    Semantic,
}

impl HitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitKind::Exact => "exact",
            HitKind::Semantic => "semantic",
        }
    }
}

/// Predicates for [`ResponseCache::invalidate`].
///
/// An entry is removed when it matches **any** supplied predicate. A filter
/// with no predicates removes nothing.
#[derive(Debug, Clone, Default)]
pub struct InvalidationFilter {
    caller: Option<String>,
    capability: Option<String>,
    context_hash: Option<String>,
    older_than: Option<Duration>,
}

impl InvalidationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries stored for this caller identity.
    pub fn caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Entries whose request required a capability whose name contains
    /// `fragment` (e.g. `"analysis"`).
    pub fn capability(mut self, fragment: impl Into<String>) -> Self {
        self.capability = Some(fragment.into().to_lowercase());
        self
    }

    /// Entries stored with this context payload.
    pub fn context(mut self, context: &serde_json::Value) -> Self {
        self.context_hash = Some(context_hash(context));
        self
    }

    /// Entries created more than `age` ago.
    pub fn older_than(mut self, age: Duration) -> Self {
        self.older_than = Some(age);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.caller.is_none()
            && self.capability.is_none()
            && self.context_hash.is_none()
            && self.older_than.is_none()
    }

    fn matches(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let by_caller = self
            .caller
            .as_deref()
            .is_some_and(|c| entry.caller.as_deref() == Some(c));
        let by_capability = self.capability.as_deref().is_some_and(|fragment| {
            entry
                .capabilities
                .iter()
                .any(|cap| cap.as_str().contains(fragment))
        });
        let by_context = self
            .context_hash
            .as_deref()
            .is_some_and(|h| entry.context_hash.as_deref() == Some(h));
        let by_age = self.older_than.is_some_and(|age| {
            (now - entry.created_at)
                .to_std()
                .is_ok_and(|elapsed| elapsed > age)
        });
        by_caller || by_capability || by_context || by_age
    }
}

/// Outcome of an optimization sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub removed: usize,
    /// Savings the removed entries had accumulated (USD).
    pub cost_forfeited: f64,
    /// Estimated memory released.
    pub bytes_freed: u64,
}

/// A frequently hit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularEntry {
    pub key: String,
    pub provider: String,
    pub hits: u64,
    pub cost_saved: f64,
}

/// Cache-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheAnalytics {
    pub entries: u64,
    pub hits: u64,
    pub semantic_hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 before any lookup.
    pub hit_rate: f64,
    /// Cumulative cost (USD) of every response served from the cache.
    pub cost_saved: f64,
    pub memory_bytes: u64,
    /// Optimization sweeps run so far.
    pub sweeps: u64,
    /// Most-hit entries, best first.
    pub top: Vec<PopularEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// In-memory response cache.
///
/// All methods take `&self`; the cache is shared across in-flight requests.
pub struct ResponseCache {
    entries: Cache<String, Arc<CacheEntry>>,
    config: CacheConfig,
    keywords: KeywordExtractor,
    hits: AtomicU64,
    semantic_hits: AtomicU64,
    misses: AtomicU64,
    sweeps: AtomicU64,
    cost_saved: Mutex<f64>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.entry_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Create a cache with the given configuration.
    ///
    /// Fails if the keyword vocabulary cannot be compiled or the semantic
    /// threshold is outside `0.0..=1.0`.
    pub fn new(config: CacheConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.semantic_threshold) {
            return Err(HuginnError::Configuration(format!(
                "semantic threshold {} outside 0.0..=1.0",
                config.semantic_threshold
            )));
        }
        let keywords = KeywordExtractor::new(&config.keywords)?;
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(EntryExpiry)
            .build();
        Ok(Self {
            entries,
            config,
            keywords,
            hits: AtomicU64::new(0),
            semantic_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            cost_saved: Mutex::new(0.0),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether an exact entry for `request` is present. No statistics are
    /// touched.
    pub fn contains(&self, request: &CompletionRequest) -> bool {
        self.entries.contains_key(&fingerprint(request))
    }

    /// Look up a response for `request`.
    ///
    /// Returns the cached response with `cached` set and `latency` replaced by
    /// the lookup time, or `None` on a miss.
    /// Inconsistent entries are logged, dropped, and treated as a miss.
    pub fn lookup(&self, request: &CompletionRequest) -> Option<CompletionResponse> {
        let start = Instant::now();
        let key = fingerprint(request);

        if let Some(entry) = self.entries.get(&key) {
            match entry.validate(&key) {
                Ok(()) => return Some(self.hit(&entry, 1.0, HitKind::Exact, start)),
                Err(e) => {
                    warn!(key = %key, error = %e, "dropping inconsistent cache entry");
                    self.entries.invalidate(&key);
                }
            }
        }

        if semantic_eligible(request)
            && let Some((entry, similarity)) = self.semantic_match(request)
        {
            return Some(self.hit(&entry, similarity, HitKind::Semantic, start));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        debug!(key = %key, "cache miss");
        None
    }

    /// Best semantic match at or above the threshold. Only entries stored for
    /// the same caller and context are considered.
    fn semantic_match(&self, request: &CompletionRequest) -> Option<(Arc<CacheEntry>, f64)> {
        let signature = self.keywords.signature(&request.user_text());
        if signature.is_empty() {
            return None;
        }
        let context = request.context().map(context_hash);

        let (key, similarity) = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                entry.caller.as_deref() == request.caller()
                    && entry.context_hash == context
                    && entry.validate(key).is_ok()
            })
            .map(|(key, entry)| (key, jaccard(&signature, &entry.signature)))
            .filter(|(_, similarity)| *similarity >= self.config.semantic_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        // Reading through the cache re-arms the entry's TTL.
        let entry = self.entries.get(key.as_str())?;
        Some((entry, similarity))
    }

    fn hit(
        &self,
        entry: &CacheEntry,
        similarity: f64,
        kind: HitKind,
        start: Instant,
    ) -> CompletionResponse {
        let saved = entry.response.cost;
        {
            let mut stats = entry.stats.lock();
            stats.hits += 1;
            stats.last_access = Utc::now();
            stats.cost_saved += saved;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        if kind == HitKind::Semantic {
            self.semantic_hits.fetch_add(1, Ordering::Relaxed);
        }
        *self.cost_saved.lock() += saved;

        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => kind.as_str()).increment(1);
        debug!(
            key = %entry.fingerprint,
            kind = kind.as_str(),
            similarity,
            provider = %entry.response.provider,
            "cache hit"
        );

        let mut response = entry.response.clone();
        response.cached = true;
        response.latency = start.elapsed();
        if kind == HitKind::Semantic {
            response.confidence = (f64::from(response.confidence) * similarity).round() as u8;
        }
        response
    }

    /// Store `response` as the answer to `request`.
    ///
    /// Placeholder responses are refused. Only requests eligible for semantic
    /// lookup get a keyword signature, so answers to simplified requests are
    /// never served to fuller ones by similarity. Returns whether the entry
    /// was written.
    pub fn store(&self, request: &CompletionRequest, response: &CompletionResponse) -> bool {
        if response.is_placeholder() || response.content.is_empty() {
            debug!("refusing to cache placeholder response");
            return false;
        }

        let key = fingerprint(request);
        let ttl = self.config.ttl_for(request, response);
        let now = Utc::now();
        let mut stored = response.clone();
        stored.cached = false;

        let entry = CacheEntry {
            response: stored,
            fingerprint: key.clone(),
            signature: if semantic_eligible(request) {
                self.keywords.signature(&request.user_text())
            } else {
                BTreeSet::new()
            },
            caller: request.caller().map(str::to_owned),
            context_hash: request.context().map(context_hash),
            capabilities: request.capabilities().to_vec(),
            created_at: now,
            ttl,
            stats: Mutex::new(EntryStats {
                last_access: now,
                hits: 0,
                cost_saved: 0.0,
            }),
        };
        debug!(key = %key, ttl_secs = ttl.as_secs(), "cache store");
        self.entries.insert(key, Arc::new(entry));
        true
    }

    /// Remove every entry matching at least one predicate of `filter`.
    /// Returns the number removed.
    pub fn invalidate(&self, filter: &InvalidationFilter) -> usize {
        if filter.is_empty() {
            return 0;
        }
        let now = Utc::now();
        let doomed: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(_, entry)| filter.matches(entry, now))
            .map(|(key, _)| key)
            .collect();
        for key in &doomed {
            self.entries.invalidate(key.as_str());
        }
        self.entries.run_pending_tasks();
        debug!(removed = doomed.len(), "cache invalidation");
        doomed.len()
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Run the optimization sweep as of now.
    pub fn optimize(&self) -> SweepReport {
        self.optimize_at(Utc::now())
    }

    /// Run the optimization sweep as of `now`.
    ///
    /// Removes entries that are
    /// - older than 7 days with fewer than 2 hits, or
    /// - idle for more than 3 days with fewer than 5 hits, or
    /// - older than 30 days.
    pub fn optimize_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let doomed: Vec<(Arc<String>, f64)> = self
            .entries
            .iter()
            .filter_map(|(key, entry)| {
                let stats = entry.stats.lock();
                let age = now - entry.created_at;
                let idle = now - stats.last_access;
                let stale = (age > chrono::Duration::days(7) && stats.hits < 2)
                    || (idle > chrono::Duration::days(3) && stats.hits < 5)
                    || age > chrono::Duration::days(30);
                stale.then_some((key, stats.cost_saved))
            })
            .collect();

        for (key, saved) in doomed {
            self.entries.invalidate(key.as_str());
            report.removed += 1;
            report.cost_forfeited += saved;
        }
        self.entries.run_pending_tasks();
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        report.bytes_freed = report.removed as u64 * ENTRY_SIZE_ESTIMATE;
        debug!(
            removed = report.removed,
            cost_forfeited = report.cost_forfeited,
            "cache sweep"
        );
        report
    }

    /// Number of live entries.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit rate, savings, and the most popular entries.
    pub fn analytics(&self) -> CacheAnalytics {
        let entries = self.len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        let mut top: Vec<PopularEntry> = self
            .entries
            .iter()
            .filter_map(|(key, entry)| {
                let stats = entry.stats.lock();
                (stats.hits > 0).then(|| PopularEntry {
                    key: key.to_string(),
                    provider: entry.response.provider.clone(),
                    hits: stats.hits,
                    cost_saved: stats.cost_saved,
                })
            })
            .collect();
        top.sort_by(|a, b| {
            b.hits
                .cmp(&a.hits)
                .then_with(|| b.cost_saved.total_cmp(&a.cost_saved))
        });
        top.truncate(TOP_ENTRIES);

        CacheAnalytics {
            entries,
            hits,
            semantic_hits: self.semantic_hits.load(Ordering::Relaxed),
            misses,
            hit_rate,
            cost_saved: *self.cost_saved.lock(),
            memory_bytes: entries * ENTRY_SIZE_ESTIMATE,
            sweeps: self.sweeps.load(Ordering::Relaxed),
            top,
        }
    }

    /// Health assessment: zero issues is healthy, three is critical.
    ///
    /// The hit-rate check only applies once there has been traffic.
    pub fn health(&self) -> HealthReport {
        let stats = self.analytics();
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if stats.hits + stats.misses > 0 && stats.hit_rate < LOW_HIT_RATE {
            issues.push(format!("low cache hit rate ({:.1}%)", stats.hit_rate * 100.0));
            recommendations.push("review which request fields feed the cache key".to_string());
        }
        if stats.memory_bytes > HIGH_MEMORY_BYTES {
            issues.push(format!("high memory usage ({} bytes)", stats.memory_bytes));
            recommendations.push("lower max_entries or shorten TTLs".to_string());
        }
        if stats.entries > HIGH_ENTRY_COUNT {
            issues.push(format!("high number of cache entries ({})", stats.entries));
            recommendations.push("run the optimization sweep more often".to_string());
        }

        let status = match issues.len() {
            0 => HealthStatus::Healthy,
            1 | 2 => HealthStatus::Warning,
            _ => HealthStatus::Critical,
        };
        HealthReport {
            status,
            issues,
            recommendations,
        }
    }

    /// Zero the hit/miss counters and cumulative savings. Entries stay.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.semantic_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        *self.cost_saved.lock() = 0.0;
    }
}
