use serde::{Deserialize, Serialize};

use crate::expr::{Context, Value};

/// How a recorded occurrence affects the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    /// Invalidates the template.
    Blocking,
    /// Recorded for visibility; never invalidates.
    Monitor,
    /// Recorded with the monitored findings. Rules attach this to
    /// occurrences they could not fully resolve.
    Debug,
    /// Suppressed without record.
    Allow,
    /// The rule's findings are dropped entirely.
    Disabled,
}

impl std::fmt::Display for RuleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Monitor => write!(f, "monitor"),
            Self::Debug => write!(f, "debug"),
            Self::Allow => write!(f, "allow"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Scope of a single finding: the whole stack, one resource, or one action
/// within a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleGranularity {
    Stack,
    Resource,
    Action,
}

impl std::fmt::Display for RuleGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack => write!(f, "stack"),
            Self::Resource => write!(f, "resource"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// A candidate policy violation produced by a rule for one occurrence.
///
/// Findings are transient. The processor merges their context with
/// run-level entries, applies the configured filters, resolves the
/// effective mode and risk, and records the survivors as violations.
#[derive(Debug, Clone)]
pub struct Finding {
    /// Identifier of the rule reporting the occurrence.
    pub rule_id: String,
    /// Human-readable description of the occurrence.
    pub reason: String,
    /// Logical ids of the resources involved.
    pub resource_ids: Vec<String>,
    /// Per-occurrence mode; takes precedence over configuration.
    pub mode: Option<RuleMode>,
    /// Per-occurrence risk; takes precedence over configuration.
    pub risk: Option<RiskLevel>,
    /// Granularity when it differs from the rule's metadata.
    pub granularity: Option<RuleGranularity>,
    /// Values the filters evaluate against.
    pub context: Context,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            reason: reason.into(),
            resource_ids: Vec::new(),
            mode: None,
            risk: None,
            granularity: None,
            context: Context::new(),
        }
    }

    pub fn with_resource(mut self, logical_id: impl Into<String>) -> Self {
        self.resource_ids.push(logical_id.into());
        self
    }

    pub fn with_mode(mut self, mode: RuleMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key, value);
        self
    }
}

/// Metadata describing a rule: defaults for mode and risk, plus the text
/// shown by `list-rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub id: String,
    pub description: String,
    pub default_mode: RuleMode,
    pub default_risk: RiskLevel,
    pub granularity: RuleGranularity,
}
