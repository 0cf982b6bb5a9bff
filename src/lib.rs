//! StackWarden — policy engine for resolved CloudFormation templates.
//!
//! Evaluates a catalogue of security rules against already-resolved
//! template JSON and aggregates the outcome into a [`rules::Verdict`].
//! Individual findings can be suppressed per rule through data-driven
//! filter expressions in `stackwarden.toml`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use stackwarden::{check_file, Config};
//!
//! let config = Config::load(Path::new("stackwarden.toml")).unwrap();
//! let verdict = check_file(Path::new("stack.json"), &config).unwrap();
//! println!("valid: {}, violations: {}", verdict.valid, verdict.violations.len());
//! ```

pub mod config;
pub mod error;
pub mod expr;
pub mod output;
pub mod rules;
pub mod template;

use std::fs;
use std::path::Path;

pub use config::Config;
pub use error::{Result, WardenError};
pub use output::OutputFormat;
pub use rules::{RuleProcessor, Verdict};
pub use template::ResolvedTemplate;

/// Evaluate every configured rule against a resolved template.
pub fn check(template: &ResolvedTemplate, config: &Config) -> Result<Verdict> {
    let processor = RuleProcessor::from_config(config)?;
    Ok(processor.process(template, config))
}

/// Load a resolved template from a JSON file and evaluate it.
pub fn check_file(path: &Path, config: &Config) -> Result<Verdict> {
    let raw = fs::read_to_string(path)?;
    let template: ResolvedTemplate =
        serde_json::from_str(&raw).map_err(|err| WardenError::Template {
            file: path.display().to_string(),
            message: err.to_string(),
        })?;
    check(&template, config)
}
