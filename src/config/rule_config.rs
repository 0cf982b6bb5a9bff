use serde::Deserialize;

use super::filter::{Filter, RawFilter};
use crate::expr::ParseError;
use crate::rules::{RiskLevel, RuleMode};

/// Per-rule configuration as written in TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRuleConfig {
    #[serde(default)]
    pub filters: Vec<RawFilter>,
    #[serde(default)]
    pub mode: Option<RuleMode>,
    #[serde(default)]
    pub risk: Option<RiskLevel>,
}

/// Validated per-rule configuration: compiled suppression filters plus
/// mode and risk overrides applied to every finding of the rule.
#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    pub filters: Vec<Filter>,
    pub mode: Option<RuleMode>,
    pub risk: Option<RiskLevel>,
}

impl RuleConfig {
    pub fn from_raw(raw: RawRuleConfig) -> Result<Self, ParseError> {
        let filters = raw
            .filters
            .into_iter()
            .map(Filter::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            filters,
            mode: raw.mode,
            risk: raw.risk,
        })
    }
}
