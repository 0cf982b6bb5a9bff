use crate::rules::{RiskLevel, Verdict, Violation};

/// Render a verdict as plain console output: blocking violations first,
/// each bucket sorted by risk (highest first) then rule id.
pub fn render(verdict: &Verdict, target_name: &str) -> String {
    let mut output = String::new();

    if verdict.violations.is_empty() && verdict.monitored.is_empty() && verdict.errors.is_empty() {
        output.push_str(&format!(
            "\n  {}: no policy violations detected.\n\n",
            target_name
        ));
        return output;
    }

    if !verdict.violations.is_empty() {
        output.push_str(&format!(
            "\n  {} blocking violation(s) in {}:\n\n",
            verdict.violations.len(),
            target_name
        ));
        for violation in sorted(&verdict.violations) {
            push_violation(&mut output, violation, false);
        }
    }

    if !verdict.monitored.is_empty() {
        output.push_str(&format!(
            "\n  {} monitored finding(s):\n\n",
            verdict.monitored.len()
        ));
        for violation in sorted(&verdict.monitored) {
            push_violation(&mut output, violation, true);
        }
    }

    if !verdict.errors.is_empty() {
        output.push_str(&format!(
            "\n  {} processing error(s):\n\n",
            verdict.errors.len()
        ));
        for error in &verdict.errors {
            match &error.filter_reason {
                Some(reason) => output.push_str(&format!(
                    "  {}: filter '{}': {}\n",
                    error.rule, reason, error.message
                )),
                None => output.push_str(&format!("  {}: {}\n", error.rule, error.message)),
            }
        }
        output.push('\n');
    }

    let status = if verdict.valid { "PASS" } else { "FAIL" };
    output.push_str(&format!("  Result: {}\n\n", status));

    output
}

fn sorted(violations: &[Violation]) -> Vec<&Violation> {
    let mut entries: Vec<&Violation> = violations.iter().collect();
    entries.sort_by(|a, b| b.risk.cmp(&a.risk).then_with(|| a.rule.cmp(&b.rule)));
    entries
}

fn push_violation(output: &mut String, violation: &Violation, show_mode: bool) {
    let risk_tag = match violation.risk {
        RiskLevel::High => "[HIGH]  ",
        RiskLevel::Medium => "[MEDIUM]",
        RiskLevel::Low => "[LOW]   ",
    };

    if show_mode {
        output.push_str(&format!(
            "  {} {} ({}) {}\n",
            risk_tag, violation.rule, violation.mode, violation.reason
        ));
    } else {
        output.push_str(&format!(
            "  {} {} {}\n",
            risk_tag, violation.rule, violation.reason
        ));
    }
    if !violation.resource_ids.is_empty() {
        output.push_str(&format!(
            "           in: {}\n",
            violation.resource_ids.join(", ")
        ));
    }
    output.push('\n');
}
