use serde::Deserialize;

use crate::expr::{Context, EvalError, Expr, ParseError};
use crate::rules::{RiskLevel, RuleMode};

/// A filter as written in configuration: the expression is still an
/// untyped tree.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFilter {
    /// Why the filter exists. Carried into error reports; has no effect on
    /// matching.
    #[serde(default)]
    pub reason: String,
    /// The expression tree.
    pub eval: serde_json::Value,
    #[serde(default)]
    pub mode: Option<RuleMode>,
    #[serde(default)]
    pub risk: Option<RiskLevel>,
}

/// A validated suppression filter.
///
/// Construction compiles and validates the expression, so a `Filter` that
/// exists can always be evaluated. A match suppresses the finding outright;
/// the mode and risk fields are retained from configuration but do not
/// reclassify (see [`crate::rules::RuleProcessor`]).
#[derive(Debug, Clone)]
pub struct Filter {
    pub reason: String,
    pub mode: Option<RuleMode>,
    pub risk: Option<RiskLevel>,
    expr: Expr,
}

impl Filter {
    pub fn from_raw(raw: RawFilter) -> Result<Self, ParseError> {
        Ok(Self {
            reason: raw.reason,
            mode: raw.mode,
            risk: raw.risk,
            expr: Expr::parse(&raw.eval)?,
        })
    }

    /// Build a filter directly from an expression tree, for library callers
    /// and tests.
    pub fn new(reason: impl Into<String>, eval: &serde_json::Value) -> Result<Self, ParseError> {
        Ok(Self {
            reason: reason.into(),
            mode: None,
            risk: None,
            expr: Expr::parse(eval)?,
        })
    }

    /// True when the expression evaluates truthy against the context.
    pub fn matches(&self, ctx: &Context) -> Result<bool, EvalError> {
        Ok(self.expr.eval(ctx)?.is_truthy())
    }
}
