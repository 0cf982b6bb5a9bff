//! Rules, findings, and the processing pipeline.

pub mod builtin;
mod finding;
mod processor;
mod result;

use crate::config::Config;
use crate::error::Result;
use crate::template::ResolvedTemplate;

pub use finding::{Finding, RiskLevel, RuleGranularity, RuleMetadata, RuleMode};
pub use processor::RuleProcessor;
pub use result::{ProcessingError, Verdict, Violation};

/// A rule inspects a resolved template and reports findings.
///
/// Rules are plug-ins: the processor sees only this trait. `run` is
/// fallible so one broken rule cannot take down the whole run; the
/// processor records the error and continues with the remaining rules.
pub trait Rule: Send + Sync {
    /// Identifier, defaults, and the text shown by `list-rules`.
    fn metadata(&self) -> RuleMetadata;

    /// Inspect the template and report every occurrence found. The run
    /// configuration is available for rules that need the stack identity.
    fn run(&self, template: &ResolvedTemplate, config: &Config) -> Result<Vec<Finding>>;
}
