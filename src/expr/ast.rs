use regex::Regex;
use thiserror::Error;

use super::value::Value;

/// The closed operator set of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    Or,
    And,
    In,
}

impl Op {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "gt" => Some(Self::Gt),
            "le" => Some(Self::Le),
            "ge" => Some(Self::Ge),
            "not" => Some(Self::Not),
            "or" => Some(Self::Or),
            "and" => Some(Self::And),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Ge => "ge",
            Self::Not => "not",
            Self::Or => "or",
            Self::And => "and",
            Self::In => "in",
        }
    }
}

/// A parsed filter expression. Immutable once built; a single tree is
/// evaluated against many contexts.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal returned verbatim at evaluation time.
    Constant(Value),
    /// Context lookup by dotted path; missing paths yield `Value::Absent`.
    Ref(String),
    /// Prefix-anchored pattern match against a string subject.
    Regex { pattern: Regex, value: Box<Expr> },
    /// Operator applied to fully evaluated children.
    Call { op: Op, args: Vec<Expr> },
}

/// Rejected expression tree. Raised while loading configuration, before any
/// template is processed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown filter operator `{0}`")]
    UnknownOperator(String),
    #[error("`{op}` expects {expected}, got {got} argument(s)")]
    Arity {
        op: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("`{op}` expects {expected}")]
    BadArgument {
        op: &'static str,
        expected: &'static str,
    },
    #[error("invalid regex `{pattern}`: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Expr {
    /// Parse an expression tree.
    ///
    /// A mapping with exactly one key is an operator call; a single-key
    /// mapping whose key is not a registered operator is rejected here, not
    /// at evaluation time. Every other tree (scalars, lists, mappings with
    /// zero or several keys) is a constant and is never recursively
    /// interpreted. Operator arity and `ref`/`regex` argument shapes are
    /// validated in this same pass.
    pub fn parse(tree: &serde_json::Value) -> Result<Self, ParseError> {
        let serde_json::Value::Object(entries) = tree else {
            return Ok(Expr::Constant(Value::from(tree.clone())));
        };
        let mut iter = entries.iter();
        let (Some((name, raw)), None) = (iter.next(), iter.next()) else {
            return Ok(Expr::Constant(Value::from(tree.clone())));
        };

        // Single-argument calls may be written without the list wrapper.
        let items: Vec<&serde_json::Value> = match raw {
            serde_json::Value::Array(xs) => xs.iter().collect(),
            other => vec![other],
        };

        match name.as_str() {
            "ref" => {
                if items.len() != 1 {
                    return Err(ParseError::Arity {
                        op: "ref",
                        expected: "exactly 1",
                        got: items.len(),
                    });
                }
                match items[0] {
                    serde_json::Value::String(path) if !path.is_empty() => {
                        Ok(Expr::Ref(path.clone()))
                    }
                    _ => Err(ParseError::BadArgument {
                        op: "ref",
                        expected: "a non-empty literal path string",
                    }),
                }
            }
            "regex" => {
                if items.len() != 2 {
                    return Err(ParseError::Arity {
                        op: "regex",
                        expected: "exactly 2",
                        got: items.len(),
                    });
                }
                let serde_json::Value::String(pattern) = items[0] else {
                    return Err(ParseError::BadArgument {
                        op: "regex",
                        expected: "a literal pattern string as its first argument",
                    });
                };
                let compiled = Regex::new(pattern).map_err(|source| ParseError::Regex {
                    pattern: pattern.clone(),
                    source,
                })?;
                Ok(Expr::Regex {
                    pattern: compiled,
                    value: Box::new(Expr::parse(items[1])?),
                })
            }
            _ => {
                let op = Op::from_name(name)
                    .ok_or_else(|| ParseError::UnknownOperator(name.clone()))?;
                check_arity(op, items.len())?;
                let args = items
                    .into_iter()
                    .map(Expr::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Call { op, args })
            }
        }
    }
}

fn check_arity(op: Op, got: usize) -> Result<(), ParseError> {
    match op {
        Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge | Op::In if got != 2 => {
            Err(ParseError::Arity {
                op: op.name(),
                expected: "exactly 2",
                got,
            })
        }
        Op::Not if got != 1 => Err(ParseError::Arity {
            op: "not",
            expected: "exactly 1",
            got,
        }),
        // or/and are n-ary, including zero arguments
        _ => Ok(()),
    }
}
