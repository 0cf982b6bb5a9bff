use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::expr::Value;
use crate::rules::{Finding, RiskLevel, Rule, RuleGranularity, RuleMetadata, RuleMode};
use crate::template::{
    account_id_from_principal, ResolvedTemplate, FULL_WILDCARD_PRINCIPAL,
    PARTIAL_WILDCARD_PRINCIPAL,
};

const RULE_ID: &str = "IamWildcardPrincipal";

/// Flags IAM role trust policies whose principal is a wildcard.
///
/// Full wildcards (`*`, or an ARN with a `*` account) are reported at the
/// rule's default risk; partial wildcards that delegate to a whole account
/// (`…:root`, a bare account id, a starred name) are downgraded to medium.
/// Principals scoped to the configured account are exempt, as is anything
/// guarded by a `Condition`. Filters see `logical_id`, `principal`, and
/// `statement`.
pub struct IamWildcardPrincipal;

impl Rule for IamWildcardPrincipal {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: RULE_ID.into(),
            description: "IAM role trust policy allows wildcard principals".into(),
            default_mode: RuleMode::Blocking,
            default_risk: RiskLevel::High,
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
                    let full = FULL_WILDCARD_PRINCIPAL.is_match(principal);
                    let partial = !full && PARTIAL_WILDCARD_PRINCIPAL.is_match(principal);
                    if !full && !partial {
                        continue;
                    }
                    if own_account.is_some()
                        && account_id_from_principal(principal) == own_account
                    {
                        continue;
                    }
                    if statement.has_condition() {
                        warn!(
                            resource = %logical_id,
                            principal = %principal,
                            "wildcard principal guarded by a condition, not flagging"
                        );
                        continue;
                    }
                    let reason = format!(
                        "{} should not allow wildcards in principals (principal: '{}')",
                        logical_id, principal
                    );
                    let mut finding = Finding::new(RULE_ID, reason)
                        .with_resource(logical_id)
                        .with_context("logical_id", Value::from(logical_id))
                        .with_context("principal", Value::from(principal))
                        .with_context("statement", Value::from(serde_json::to_value(statement)?));
                    if partial {
                        finding = finding.with_risk(RiskLevel::Medium);
                    }
                    findings.push(finding);
                }
            }
        }
        Ok(findings)
    }
}
