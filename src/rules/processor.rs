use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use super::{
    builtin, Finding, ProcessingError, RiskLevel, Rule, RuleMetadata, RuleMode, Verdict,
    Violation,
};
use crate::config::Config;
use crate::error::{Result, WardenError};
use crate::expr::{Context, Value};
use crate::template::ResolvedTemplate;

/// Runs rules in order and aggregates their findings into a [`Verdict`].
///
/// Per finding the processor merges the evaluation context with the
/// run-level entries, applies the configured filters, resolves the
/// effective mode and risk, and records what survives. A failing rule or
/// filter is isolated: the error lands in the verdict and processing
/// continues.
pub struct RuleProcessor {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleProcessor {
    /// Processor over an explicit rule list, run in the given order.
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Processor for the configured rule list. Unknown ids are rejected
    /// before anything runs; an empty list selects every built-in rule.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.rules.is_empty() {
            return Ok(Self::default());
        }
        let rules = config
            .rules
            .iter()
            .map(|id| {
                builtin::rule_by_id(id).ok_or_else(|| WardenError::UnknownRule(id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Metadata for the registered rules, in evaluation order.
    pub fn list_rules(&self) -> Vec<RuleMetadata> {
        self.rules.iter().map(|rule| rule.metadata()).collect()
    }

    /// Process one template.
    pub fn process(&self, template: &ResolvedTemplate, config: &Config) -> Verdict {
        self.process_with_extras(template, config, BTreeMap::new())
    }

    /// Process one template with per-run extra values, visible to filters
    /// under `extras`.
    pub fn process_with_extras(
        &self,
        template: &ResolvedTemplate,
        config: &Config,
        extras: BTreeMap<String, Value>,
    ) -> Verdict {
        let mut verdict = Verdict::new();
        for rule in &self.rules {
            let metadata = rule.metadata();
            let findings = match rule.run(template, config) {
                Ok(findings) => findings,
                Err(err) => {
                    error!(rule = %metadata.id, error = %err, "rule failed, skipping");
                    verdict.record_error(ProcessingError {
                        rule: metadata.id.clone(),
                        filter_reason: None,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            for finding in findings {
                self.apply(&metadata, finding, config, &extras, &mut verdict);
            }
        }
        verdict
    }

    /// Filter one finding and record it under its effective mode.
    fn apply(
        &self,
        metadata: &RuleMetadata,
        finding: Finding,
        config: &Config,
        extras: &BTreeMap<String, Value>,
        verdict: &mut Verdict,
    ) {
        let rule_config = config.rule_config(&finding.rule_id);

        // Finding-level hints beat configuration, configuration beats the
        // rule's defaults.
        let mode = finding
            .mode
            .or(rule_config.and_then(|c| c.mode))
            .unwrap_or(metadata.default_mode);
        let risk = finding
            .risk
            .or(rule_config.and_then(|c| c.risk))
            .unwrap_or(metadata.default_risk);
        let granularity = finding.granularity.unwrap_or(metadata.granularity);

        let context = merged_context(&finding, mode, risk, config, extras);
        for filter in rule_config.map(|c| c.filters.as_slice()).unwrap_or_default() {
            match filter.matches(&context) {
                Ok(true) => {
                    debug!(
                        rule = %finding.rule_id,
                        filter = %filter.reason,
                        "finding suppressed"
                    );
                    if filter.mode.is_some() || filter.risk.is_some() {
                        debug!(
                            rule = %finding.rule_id,
                            filter = %filter.reason,
                            "matched filter carries mode/risk overrides; suppressing regardless"
                        );
                    }
                    return;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        rule = %finding.rule_id,
                        filter = %filter.reason,
                        error = %err,
                        "filter evaluation failed, treating as no match"
                    );
                    verdict.record_error(ProcessingError {
                        rule: finding.rule_id.clone(),
                        filter_reason: Some(filter.reason.clone()),
                        message: err.to_string(),
                    });
                }
            }
        }

        verdict.record(Violation {
            rule: finding.rule_id,
            reason: finding.reason,
            risk,
            mode,
            granularity,
            resource_ids: finding.resource_ids,
        });
    }
}

impl Default for RuleProcessor {
    fn default() -> Self {
        Self::new(builtin::all_rules())
    }
}

impl std::fmt::Debug for RuleProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleProcessor")
            .field(
                "rules",
                &self.rules.iter().map(|rule| rule.metadata().id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The finding's own context plus the run-level entries: `config` (stack
/// name and account id), `rule` (the owning rule's effective
/// configuration), and `extras` when provided.
fn merged_context(
    finding: &Finding,
    mode: RuleMode,
    risk: RiskLevel,
    config: &Config,
    extras: &BTreeMap<String, Value>,
) -> Context {
    let mut context = finding.context.clone();

    let mut run_entries = BTreeMap::new();
    if let Some(stack_name) = &config.stack_name {
        run_entries.insert("stack_name".to_owned(), Value::from(stack_name.as_str()));
    }
    if let Some(account_id) = &config.aws_account_id {
        run_entries.insert("aws_account_id".to_owned(), Value::from(account_id.as_str()));
    }
    context.insert("config", Value::Map(run_entries));

    context.insert(
        "rule",
        Value::Map(BTreeMap::from([
            ("id".to_owned(), Value::from(finding.rule_id.as_str())),
            ("mode".to_owned(), Value::String(mode.to_string())),
            ("risk".to_owned(), Value::String(risk.to_string())),
        ])),
    );

    if !extras.is_empty() {
        context.insert("extras", Value::Map(extras.clone()));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawRuleConfig, RuleConfig};
    use crate::rules::RuleGranularity;
    use serde_json::json;

    struct StaticRule {
        metadata: RuleMetadata,
        findings: Vec<Finding>,
    }

    impl Rule for StaticRule {
        fn metadata(&self) -> RuleMetadata {
            self.metadata.clone()
        }

        fn run(&self, _template: &ResolvedTemplate, _config: &Config) -> Result<Vec<Finding>> {
            Ok(self.findings.clone())
        }
    }

    struct FailingRule;

    impl Rule for FailingRule {
        fn metadata(&self) -> RuleMetadata {
            make_metadata("BrokenRule")
        }

        fn run(&self, _template: &ResolvedTemplate, _config: &Config) -> Result<Vec<Finding>> {
            Err(WardenError::Rule {
                rule_id: "BrokenRule".into(),
                message: "boom".into(),
            })
        }
    }

    fn make_metadata(id: &str) -> RuleMetadata {
        RuleMetadata {
            id: id.into(),
            description: "test rule".into(),
            default_mode: RuleMode::Blocking,
            default_risk: RiskLevel::Medium,
            granularity: RuleGranularity::Resource,
        }
    }

    fn make_finding(reason: &str) -> Finding {
        Finding::new("TestRule", reason)
            .with_resource("resourceA")
            .with_context("ingress_ip", Value::from("11.0.0.0/8"))
            .with_context("port", Value::Int(46))
    }

    fn processor_with(findings: Vec<Finding>) -> RuleProcessor {
        RuleProcessor::new(vec![Box::new(StaticRule {
            metadata: make_metadata("TestRule"),
            findings,
        })])
    }

    fn rule_config_with_filters(filters: Vec<serde_json::Value>) -> Config {
        let raw: RawRuleConfig = serde_json::from_value(json!({ "filters": filters })).unwrap();
        let mut config = Config {
            stack_name: Some("mockstack".into()),
            aws_account_id: Some("123456789012".into()),
            ..Default::default()
        };
        config
            .rules_config
            .insert("TestRule".into(), RuleConfig::from_raw(raw).unwrap());
        config
    }

    #[test]
    fn findings_become_blocking_violations_in_order() {
        let processor = processor_with(vec![make_finding("first"), make_finding("second")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &Config::default());
        assert!(!verdict.valid);
        let reasons: Vec<&str> = verdict.violations.iter().map(|v| v.reason.as_str()).collect();
        assert_eq!(reasons, ["first", "second"]);
        assert_eq!(verdict.violations[0].mode, RuleMode::Blocking);
        assert_eq!(verdict.violations[0].risk, RiskLevel::Medium);
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn any_matching_filter_suppresses_the_finding() {
        let config = rule_config_with_filters(vec![json!({
            "reason": "trusted stack",
            "eval": {"eq": [{"ref": "config.stack_name"}, "mockstack"]}
        })]);
        let processor = processor_with(vec![make_finding("first"), make_finding("second")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert!(verdict.violations.is_empty());
        assert!(verdict.monitored.is_empty());
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn non_matching_filters_leave_findings_untouched() {
        let config = rule_config_with_filters(vec![json!({
            "eval": {"eq": [{"ref": "config.stack_name"}, "anotherstack"]}
        })]);
        let processor = processor_with(vec![make_finding("first"), make_finding("second")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(!verdict.valid);
        assert_eq!(verdict.violations.len(), 2);
    }

    #[test]
    fn a_match_with_mode_and_risk_overrides_still_suppresses() {
        let config = rule_config_with_filters(vec![json!({
            "reason": "legacy override style",
            "mode": "monitor",
            "risk": "low",
            "eval": {"eq": [{"ref": "config.stack_name"}, "mockstack"]}
        })]);
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert!(verdict.violations.is_empty());
        assert!(verdict.monitored.is_empty());
    }

    #[test]
    fn filters_can_reach_into_finding_context() {
        let config = rule_config_with_filters(vec![json!({
            "eval": {"in": [{"ref": "ingress_ip"}, ["11.0.0.0/8", "::/0"]]}
        })]);
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn config_mode_and_risk_overrides_apply() {
        let mut config = Config::default();
        config.rules_config.insert(
            "TestRule".into(),
            RuleConfig {
                filters: vec![],
                mode: Some(RuleMode::Monitor),
                risk: Some(RiskLevel::Low),
            },
        );
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert!(verdict.violations.is_empty());
        assert_eq!(verdict.monitored.len(), 1);
        assert_eq!(verdict.monitored[0].mode, RuleMode::Monitor);
        assert_eq!(verdict.monitored[0].risk, RiskLevel::Low);
    }

    #[test]
    fn finding_mode_hint_beats_config_override() {
        let mut config = Config::default();
        config.rules_config.insert(
            "TestRule".into(),
            RuleConfig {
                filters: vec![],
                mode: Some(RuleMode::Blocking),
                risk: None,
            },
        );
        let finding = make_finding("unresolved principal").with_mode(RuleMode::Debug);
        let processor = processor_with(vec![finding]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert_eq!(verdict.monitored.len(), 1);
        assert_eq!(verdict.monitored[0].mode, RuleMode::Debug);
    }

    #[test]
    fn disabled_rules_report_nothing() {
        let mut config = Config::default();
        config.rules_config.insert(
            "TestRule".into(),
            RuleConfig {
                filters: vec![],
                mode: Some(RuleMode::Disabled),
                risk: None,
            },
        );
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert!(verdict.violations.is_empty());
        assert!(verdict.monitored.is_empty());
    }

    #[test]
    fn filter_evaluation_errors_are_conservative() {
        // Ordering a number against a string fails; the finding must be
        // reported anyway and the error attributed to the filter.
        let config = rule_config_with_filters(vec![json!({
            "reason": "bad types",
            "eval": {"lt": [{"ref": "port"}, "46"]}
        })]);
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(!verdict.valid);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.errors.len(), 1);
        assert_eq!(verdict.errors[0].rule, "TestRule");
        assert_eq!(verdict.errors[0].filter_reason.as_deref(), Some("bad types"));
    }

    #[test]
    fn a_later_filter_still_suppresses_after_an_earlier_error() {
        let config = rule_config_with_filters(vec![
            json!({"reason": "bad types", "eval": {"lt": [{"ref": "port"}, "46"]}}),
            json!({"reason": "trusted", "eval": {"eq": [{"ref": "config.stack_name"}, "mockstack"]}}),
        ]);
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
        assert!(verdict.violations.is_empty());
        assert_eq!(verdict.errors.len(), 1);
    }

    #[test]
    fn a_failing_rule_does_not_stop_the_others() {
        let processor = RuleProcessor::new(vec![
            Box::new(FailingRule),
            Box::new(StaticRule {
                metadata: make_metadata("TestRule"),
                findings: vec![make_finding("still reported")],
            }),
        ]);
        let verdict = processor.process(&ResolvedTemplate::default(), &Config::default());
        assert!(!verdict.valid);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.errors.len(), 1);
        assert_eq!(verdict.errors[0].rule, "BrokenRule");
        assert!(verdict.errors[0].filter_reason.is_none());
    }

    #[test]
    fn extras_are_addressable_by_filters() {
        let config = rule_config_with_filters(vec![json!({
            "eval": {"eq": [{"ref": "extras.pipeline"}, "ci"]}
        })]);
        let processor = processor_with(vec![make_finding("finding")]);

        let extras = BTreeMap::from([("pipeline".to_owned(), Value::from("ci"))]);
        let verdict =
            processor.process_with_extras(&ResolvedTemplate::default(), &config, extras);
        assert!(verdict.valid);

        // Without extras the same filter resolves to absent and fails.
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(!verdict.valid);
    }

    #[test]
    fn the_owning_rule_is_visible_to_filters() {
        let config = rule_config_with_filters(vec![json!({
            "eval": {"and": [
                {"eq": [{"ref": "rule.id"}, "TestRule"]},
                {"eq": [{"ref": "rule.mode"}, "blocking"]}
            ]}
        })]);
        let processor = processor_with(vec![make_finding("finding")]);
        let verdict = processor.process(&ResolvedTemplate::default(), &config);
        assert!(verdict.valid);
    }

    #[test]
    fn from_config_rejects_unknown_rules() {
        let config = Config {
            rules: vec!["NoSuchRule".into()],
            ..Default::default()
        };
        let err = RuleProcessor::from_config(&config).unwrap_err();
        assert!(matches!(err, WardenError::UnknownRule(id) if id == "NoSuchRule"));
    }

    #[test]
    fn from_config_with_empty_list_selects_all_builtins() {
        let processor = RuleProcessor::from_config(&Config::default()).unwrap();
        assert_eq!(processor.list_rules().len(), builtin::all_rules().len());
    }

    #[test]
    fn from_config_respects_the_configured_order() {
        let config = Config {
            rules: vec!["CrossAccountTrust".into(), "SecurityGroupOpenToWorld".into()],
            ..Default::default()
        };
        let processor = RuleProcessor::from_config(&config).unwrap();
        let ids: Vec<String> = processor.list_rules().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, ["CrossAccountTrust", "SecurityGroupOpenToWorld"]);
    }
}
