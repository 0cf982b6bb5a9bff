//! Run configuration: stack identity, the active rule list, and per-rule
//! overrides and suppression filters.
//!
//! Filters are compiled while the configuration loads, so every expression
//! error is reported before any template is processed.

mod filter;
mod rule_config;

pub use filter::{Filter, RawFilter};
pub use rule_config::{RawRuleConfig, RuleConfig};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, WardenError};

/// Top-level configuration from `stackwarden.toml`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Name of the stack under evaluation; filters see it as
    /// `config.stack_name`.
    pub stack_name: Option<String>,
    /// Account the stack belongs to; used by the cross-account trust rule.
    pub aws_account_id: Option<String>,
    /// Active rules, in evaluation order. Empty means all built-in rules.
    pub rules: Vec<String>,
    /// Per-rule overrides and filters, keyed by rule id.
    pub rules_config: BTreeMap<String, RuleConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    stack_name: Option<String>,
    #[serde(default)]
    aws_account_id: Option<String>,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    rules_config: BTreeMap<String, RawRuleConfig>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    /// Fails if any configured filter expression is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let raw: RawConfig = toml::from_str(&content)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let mut rules_config = BTreeMap::new();
        for (rule, rule_raw) in raw.rules_config {
            let validated = RuleConfig::from_raw(rule_raw).map_err(|source| {
                WardenError::Filter {
                    rule: rule.clone(),
                    source,
                }
            })?;
            rules_config.insert(rule, validated);
        }
        Ok(Self {
            stack_name: raw.stack_name,
            aws_account_id: raw.aws_account_id,
            rules: raw.rules,
            rules_config,
        })
    }

    pub fn rule_config(&self, rule_id: &str) -> Option<&RuleConfig> {
        self.rules_config.get(rule_id)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# stack-warden configuration

# Name of the stack under evaluation; filter expressions can reference it
# as `config.stack_name`.
# stack_name = "mockstack"

# Account the stack belongs to; the cross-account trust rule needs it.
# aws_account_id = "123456789012"

# Active rules in evaluation order. Leave unset to run every built-in rule.
# rules = ["SecurityGroupOpenToWorld", "CrossAccountTrust", "IamWildcardPrincipal"]

# Per-rule overrides.
# [rules_config.CrossAccountTrust]
# mode = "monitor"

# Suppression filters. A finding is dropped when any filter matches its
# context.
# [[rules_config.SecurityGroupOpenToWorld.filters]]
# reason = "Internal ranges reviewed by the network team"
# eval = { in = [{ ref = "ingress_ip" }, ["11.0.0.0/8", "::/0"]] }
"#
    }
}
