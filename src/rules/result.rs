use serde::{Deserialize, Serialize};

use super::{RiskLevel, RuleGranularity, RuleMode};

/// A recorded policy violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub reason: String,
    pub risk: RiskLevel,
    pub mode: RuleMode,
    pub granularity: RuleGranularity,
    pub resource_ids: Vec<String>,
}

/// A failure isolated during processing: a rule that failed to run, or a
/// filter that could not be evaluated against a finding's context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingError {
    pub rule: String,
    /// Reason text of the filter involved, when the failure came from one.
    pub filter_reason: Option<String>,
    pub message: String,
}

/// Outcome of processing one template: overall validity plus the recorded
/// violations, bucketed by effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// False exactly when `violations` is non-empty. Maintained by
    /// [`Verdict::record`].
    pub valid: bool,
    /// Blocking violations, in rule order then finding order.
    pub violations: Vec<Violation>,
    /// Monitor and debug findings; informational, never invalidate.
    pub monitored: Vec<Violation>,
    /// Failures isolated during the run.
    pub errors: Vec<ProcessingError>,
}

impl Verdict {
    pub fn new() -> Self {
        Self {
            valid: true,
            violations: Vec::new(),
            monitored: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a violation under its effective mode. Blocking entries clear
    /// `valid`; monitor and debug entries are kept without affecting it;
    /// allow and disabled entries are dropped.
    pub fn record(&mut self, violation: Violation) {
        match violation.mode {
            RuleMode::Blocking => {
                self.valid = false;
                self.violations.push(violation);
            }
            RuleMode::Monitor | RuleMode::Debug => self.monitored.push(violation),
            RuleMode::Allow | RuleMode::Disabled => {}
        }
    }

    pub fn record_error(&mut self, error: ProcessingError) {
        self.errors.push(error);
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::new()
    }
}
