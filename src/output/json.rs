use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::rules::Verdict;

#[derive(Serialize)]
struct JsonReport<'a> {
    target: &'a str,
    generated_at: DateTime<Utc>,
    verdict: &'a Verdict,
}

/// Render a verdict as a JSON report.
pub fn render(verdict: &Verdict, target_name: &str) -> Result<String> {
    let report = JsonReport {
        target: target_name,
        generated_at: Utc::now(),
        verdict,
    };
    let json = serde_json::to_string_pretty(&report)?;
    Ok(json)
}
