//! The data-expr predicate language.
//!
//! A data-expr marker selects every source row for which an expression over
//! `datum` is truthy, e.g. `datum.value > 40 && datum.category === 'B'`.

pub mod ast;
pub mod eval;
pub mod grammar;
pub mod lexer;

use serde_json::Value;

use crate::error::ExprError;

pub use ast::Expr;
pub use eval::{evaluate, ExprValue};
pub use grammar::parse;

/// A compiled row predicate
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Parse `source`, returning the first syntax error on failure
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let expr = parse(source).map_err(|errs| {
            errs.into_iter()
                .next()
                .unwrap_or_else(|| ExprError::eval("empty parse result"))
        })?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the expression is truthy with `datum` bound to `row`
    pub fn matches(&self, row: &Value) -> Result<bool, ExprError> {
        evaluate(&self.expr, row).map(|v| v.is_truthy())
    }

    /// Rows matching the predicate, in input order.
    ///
    /// Evaluation stops at the first row that raises an error.
    pub fn filter<'r>(&self, rows: &'r [Value]) -> Result<Vec<&'r Value>, ExprError> {
        let mut matched = Vec::new();
        for row in rows {
            if self.matches(row)? {
                matched.push(row);
            }
        }
        Ok(matched)
    }
}
