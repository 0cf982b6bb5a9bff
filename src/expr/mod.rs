//! The filter expression engine.
//!
//! A small, closed expression language evaluated over untyped template
//! data. Expression trees arrive as JSON, are parsed once into an immutable
//! [`Expr`] with operator and arity validation, and are then evaluated
//! against a [`Context`] of named values. Evaluation is pure; the only
//! runtime failures are type mismatches, and those are scoped to the single
//! filter application that raised them.

mod ast;
mod eval;
mod value;

pub use ast::{Expr, Op, ParseError};
pub use eval::EvalError;
pub use value::{Context, Value};
