use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::expr::Value;
use crate::rules::{Finding, RiskLevel, Rule, RuleGranularity, RuleMetadata, RuleMode};
use crate::template::{account_id_from_principal, ResolvedTemplate};

const RULE_ID: &str = "CrossAccountTrust";

/// Flags IAM roles whose assume-role policy trusts a principal outside
/// the configured account.
///
/// Service principals (`*.amazonaws.com`) are never flagged. Statements
/// guarded by a `Condition` are skipped with a warning, as are all
/// statements when no `aws_account_id` is configured. Filters see
/// `logical_id`, `resource`, `statement`, `principal`, and `account_id`.
pub struct CrossAccountTrust;

impl Rule for CrossAccountTrust {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: RULE_ID.into(),
            description: "IAM role can be assumed from outside the owning account".into(),
            default_mode: RuleMode::Blocking,
            default_risk: RiskLevel::Medium,
            granularity: RuleGranularity::Resource,
        }
    }

    fn run(&self, template: &ResolvedTemplate, config: &Config) -> Result<Vec<Finding>> {
        let own_account = config.aws_account_id.as_deref();
        let mut findings = Vec::new();
        for (logical_id, role) in template.iam_roles() {
            let Some(policy) = &role.assume_role_policy_document else {
                continue;
            };
            for statement in &policy.statement {
                if !statement.allows() {
                    continue;
                }
                for principal in statement.principals() {
                    if principal.ends_with(".amazonaws.com") {
                        continue;
                    }
                    let account_id = account_id_from_principal(principal);
                    if let Some(own) = own_account {
                        if principal == own || account_id == Some(own) {
                            continue;
                        }
                    }
                    if statement.has_condition() {
                        warn!(
                            resource = %logical_id,
                            principal = %principal,
                            "trust statement carries a condition, not flagging"
                        );
                        continue;
                    }
                    if own_account.is_none() {
                        warn!(
                            resource = %logical_id,
                            "no aws_account_id configured, cannot judge cross-account trust"
                        );
                        continue;
                    }
                    let reason = format!(
                        "{} has forbidden cross-account trust relationship with {}",
                        logical_id, principal
                    );
                    let mut finding = Finding::new(RULE_ID, reason)
                        .with_resource(logical_id)
                        .with_context("logical_id", Value::from(logical_id))
                        .with_context("resource", Value::from(serde_json::to_value(role)?))
                        .with_context("statement", Value::from(serde_json::to_value(statement)?))
                        .with_context("principal", Value::from(principal));
                    if let Some(account) = account_id {
                        finding = finding.with_context("account_id", Value::from(account));
                    }
                    // Unresolved intrinsics surface as marker-prefixed
                    // principals; downgrade those occurrences to debug.
                    if principal.starts_with("GETATT") || principal.starts_with("UNDEFINED_") {
                        finding = finding.with_mode(RuleMode::Debug);
                    }
                    findings.push(finding);
                }
            }
        }
        Ok(findings)
    }
}
