//! Capability tags and request tiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// A task type a provider is strong at, or a request requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// General dialogue. The minimum capability of a degraded request.
    GeneralChat,
    /// Domain-specific analysis. Data behind it changes often.
    #[serde(alias = "fantasy_analysis")]
    DomainAnalysis,
    ComplexReasoning,
    CreativeWriting,
    CodeGeneration,
    DataAnalysis,
    Mathematical,
    FastResponse,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::GeneralChat,
        Capability::DomainAnalysis,
        Capability::ComplexReasoning,
        Capability::CreativeWriting,
        Capability::CodeGeneration,
        Capability::DataAnalysis,
        Capability::Mathematical,
        Capability::FastResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::GeneralChat => "general_chat",
            Capability::DomainAnalysis => "domain_analysis",
            Capability::ComplexReasoning => "complex_reasoning",
            Capability::CreativeWriting => "creative_writing",
            Capability::CodeGeneration => "code_generation",
            Capability::DataAnalysis => "data_analysis",
            Capability::Mathematical => "mathematical",
            Capability::FastResponse => "fast_response",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = crate::HuginnError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .or_else(|| (s == "fantasy_analysis").then_some(Capability::DomainAnalysis))
            .ok_or_else(|| crate::HuginnError::InvalidInput(format!("unknown capability '{s}'")))
    }
}

/// Complexity tier of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    #[serde(alias = "medium")]
    Moderate,
    #[serde(alias = "high")]
    Complex,
    Expert,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
            Complexity::Expert => "expert",
        }
    }
}

impl std::str::FromStr for Complexity {
    type Err = crate::HuginnError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "simple" => Ok(Complexity::Simple),
            "moderate" | "medium" => Ok(Complexity::Moderate),
            "complex" | "high" => Ok(Complexity::Complex),
            "expert" => Ok(Complexity::Expert),
            other => Err(crate::HuginnError::InvalidInput(format!(
                "unknown complexity '{other}'"
            ))),
        }
    }
}

/// Priority tier of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    #[serde(alias = "normal")]
    Medium,
    High,
    Critical,
}

impl std::str::FromStr for Priority {
    type Err = crate::HuginnError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(crate::HuginnError::InvalidInput(format!(
                "unknown priority '{other}'"
            ))),
        }
    }
}
