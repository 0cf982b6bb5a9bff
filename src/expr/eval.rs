use std::cmp::Ordering;

use thiserror::Error;

use super::ast::{Expr, Op};
use super::value::{Context, Value};

/// Evaluation failure. Scoped to the single filter application that raised
/// it; the processor records it and moves on.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("`{op}` cannot order {left} against {right}")]
    Incomparable {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("`in` needs a list, string, or mapping to search, got {got}")]
    NotAContainer { got: &'static str },
    #[error("`regex` needs a string subject, got {got}")]
    NotAString { got: &'static str },
}

impl Expr {
    /// Evaluate against a context. Pure and deterministic.
    ///
    /// Children evaluate left to right and exhaustively; `and` and `or`
    /// never short-circuit, so a type error in a later child surfaces even
    /// when an earlier child already decided the outcome.
    pub fn eval(&self, ctx: &Context) -> Result<Value, EvalError> {
        match self {
            Expr::Constant(v) => Ok(v.clone()),
            Expr::Ref(path) => Ok(ctx.get_path(path)),
            Expr::Regex { pattern, value } => {
                let subject = value.eval(ctx)?;
                let Value::String(s) = &subject else {
                    return Err(EvalError::NotAString {
                        got: subject.type_name(),
                    });
                };
                // Anchored at the start of the subject, not spanning it.
                let hit = pattern.find(s).map_or(false, |m| m.start() == 0);
                Ok(Value::Bool(hit))
            }
            Expr::Call { op, args } => {
                let vals = args
                    .iter()
                    .map(|arg| arg.eval(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                apply(*op, &vals)
            }
        }
    }
}

fn apply(op: Op, vals: &[Value]) -> Result<Value, EvalError> {
    match (op, vals) {
        (Op::Not, [v]) => Ok(Value::Bool(!v.is_truthy())),
        (Op::Or, vs) => Ok(Value::Bool(vs.iter().any(Value::is_truthy))),
        (Op::And, vs) => Ok(Value::Bool(vs.iter().all(Value::is_truthy))),
        (Op::Eq, [a, b]) => Ok(Value::Bool(a.loose_eq(b))),
        (Op::Ne, [a, b]) => Ok(Value::Bool(!a.loose_eq(b))),
        (Op::Lt, [a, b]) => Ok(Value::Bool(ordering(op, a, b)? == Ordering::Less)),
        (Op::Le, [a, b]) => Ok(Value::Bool(ordering(op, a, b)? != Ordering::Greater)),
        (Op::Gt, [a, b]) => Ok(Value::Bool(ordering(op, a, b)? == Ordering::Greater)),
        (Op::Ge, [a, b]) => Ok(Value::Bool(ordering(op, a, b)? != Ordering::Less)),
        (Op::In, [needle, haystack]) => contains(needle, haystack),
        // arity is enforced at parse time
        _ => Ok(Value::Absent),
    }
}

fn ordering(op: Op, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    a.compare(b).ok_or(EvalError::Incomparable {
        op: op.name(),
        left: a.type_name(),
        right: b.type_name(),
    })
}

fn contains(needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
    let found = match haystack {
        Value::List(items) => items.iter().any(|item| item.loose_eq(needle)),
        Value::String(s) => match needle {
            Value::String(sub) => s.contains(sub.as_str()),
            _ => false,
        },
        Value::Map(entries) => match needle {
            Value::String(key) => entries.contains_key(key),
            _ => false,
        },
        other => {
            return Err(EvalError::NotAContainer {
                got: other.type_name(),
            })
        }
    };
    Ok(Value::Bool(found))
}
