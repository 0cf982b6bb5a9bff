use std::collections::BTreeSet;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::rules::{builtin, RiskLevel, Verdict, Violation};

/// Render a verdict as SARIF 2.1.0.
///
/// Produces a self-contained SARIF log compatible with GitHub Code Scanning
/// and other SARIF consumers. Template resources appear as logical
/// locations; resolved templates carry no file positions.
pub fn render(verdict: &Verdict, target_name: &str) -> Result<String> {
    let fired: BTreeSet<&String> = verdict
        .violations
        .iter()
        .chain(&verdict.monitored)
        .map(|violation| &violation.rule)
        .collect();

    let rules: Vec<Value> = fired
        .into_iter()
        .map(|rule_id| match builtin::rule_by_id(rule_id) {
            Some(rule) => {
                let metadata = rule.metadata();
                json!({
                    "id": metadata.id,
                    "shortDescription": { "text": metadata.description },
                    "defaultConfiguration": {
                        "level": risk_to_sarif_level(metadata.default_risk),
                    },
                })
            }
            None => json!({ "id": rule_id }),
        })
        .collect();

    let results: Vec<Value> = verdict
        .violations
        .iter()
        .map(|violation| to_result(violation, risk_to_sarif_level(violation.risk)))
        .chain(
            verdict
                .monitored
                .iter()
                .map(|violation| to_result(violation, "note")),
        )
        .collect();

    let sarif = json!({
        "$schema": "https://docs.oasis-open.org/sarif/sarif/v2.1.0/errata01/os/schemas/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "StackWarden",
                    "informationUri": "https://github.com/stackwarden/stackwarden",
                    "version": env!("CARGO_PKG_VERSION"),
                    "semanticVersion": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                },
            },
            "results": results,
            "automationDetails": {
                "id": format!("stackwarden/{}", target_name),
                "guid": Uuid::new_v4().to_string(),
            },
        }],
    });

    let output = serde_json::to_string_pretty(&sarif)?;
    Ok(output)
}

fn to_result(violation: &Violation, level: &str) -> Value {
    let mut result = json!({
        "ruleId": violation.rule,
        "level": level,
        "message": { "text": violation.reason },
        "properties": {
            "mode": violation.mode.to_string(),
            "granularity": violation.granularity.to_string(),
        },
    });

    if !violation.resource_ids.is_empty() {
        let locations: Vec<Value> = violation
            .resource_ids
            .iter()
            .map(|id| {
                json!({
                    "logicalLocations": [{
                        "name": id,
                        "kind": "resource",
                    }],
                })
            })
            .collect();
        result["locations"] = json!(locations);
    }

    result
}

fn risk_to_sarif_level(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => "error",
        RiskLevel::Medium => "warning",
        RiskLevel::Low => "note",
    }
}
