//! Cache keys and semantic signatures.
//!
//! The exact-match key is a SHA-256 digest over the normalized request.
//! Every variable-length field is length-prefixed, so no field value can
//! spill into the next one:
//!
//! ```text
//! message count, then per message: role, content   content trimmed + lowercased
//! complexity
//! capability count, then each capability           sorted
//! temperature in tenths
//! caller                                           presence tag + value
//! sha256 of context JSON                           presence tag + value
//! ```
//!
//! The semantic signature is the set of vocabulary stems found in the
//! user-authored turns. Two signatures are compared with Jaccard similarity.

use std::collections::BTreeSet;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::types::CompletionRequest;
use crate::{HuginnError, Result};

/// Default domain vocabulary for semantic signatures.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "lineup",
    "trade",
    "waiver",
    "draft",
    "player",
    "matchup",
    "projection",
    "injury",
    "start",
    "sit",
];

/// Exact-match cache key of `request`, as lowercase hex.
///
/// Pure and deterministic: identical normalized content always yields the
/// same key, independent of capability order or surrounding whitespace.
pub fn fingerprint(request: &CompletionRequest) -> String {
    let mut hasher = Sha256::new();

    hasher.update((request.messages().len() as u64).to_le_bytes());
    for message in request.messages() {
        field(&mut hasher, message.role.as_str());
        field(&mut hasher, &message.content.trim().to_lowercase());
    }

    field(&mut hasher, request.complexity().as_str());

    // Capabilities are kept sorted by the request builder.
    hasher.update((request.capabilities().len() as u64).to_le_bytes());
    for capability in request.capabilities() {
        field(&mut hasher, capability.as_str());
    }

    let tenths = (request.temperature() * 10.0).round() as i32;
    hasher.update(tenths.to_le_bytes());

    optional_field(&mut hasher, request.caller());
    optional_field(&mut hasher, request.context().map(context_hash).as_deref());

    hex::encode(hasher.finalize())
}

/// Length-prefixed field.
fn field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn optional_field(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            field(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}

/// Digest of a context payload.
///
/// Object keys serialize in sorted order, so logically equal payloads hash
/// identically.
pub fn context_hash(context: &serde_json::Value) -> String {
    hex::encode(Sha256::digest(context.to_string().as_bytes()))
}

/// Extracts semantic signatures using a fixed vocabulary.
///
/// A vocabulary word must start a word and absorbs any suffix, so
/// `"trades"` contributes `"trade"` while `"restart"` contributes nothing.
/// Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    pattern: Option<Regex>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS).unwrap_or(Self { pattern: None })
    }
}

impl KeywordExtractor {
    /// Build an extractor over `vocabulary`. An empty vocabulary never
    /// produces a signature.
    pub fn new<I, S>(vocabulary: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = vocabulary
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect();
        if words.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(&format!(r"\b({})\w*\b", words.join("|")))
            .map_err(|e| HuginnError::Configuration(format!("keyword vocabulary: {e}")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Sorted set of vocabulary stems found in `text`.
    pub fn signature(&self, text: &str) -> BTreeSet<String> {
        let Some(pattern) = &self.pattern else {
            return BTreeSet::new();
        };
        let lowered = text.to_lowercase();
        pattern
            .captures_iter(&lowered)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Jaccard similarity `|a ∩ b| / |a ∪ b|`.
///
/// Two empty sets score 0.0: no keywords means no evidence of similarity.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
