//! Evaluation of data-expr trees against a single data row

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::ExprError;
use crate::expr::ast::{BinaryOp, Expr, Literal, UnaryOp};

/// Runtime value of an expression, a JSON value extended with `undefined`
/// and non-finite numbers
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl From<&Value> for ExprValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ExprValue::Null,
            Value::Bool(b) => ExprValue::Bool(*b),
            Value::Number(n) => ExprValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => ExprValue::Str(s.clone()),
            Value::Array(items) => ExprValue::Array(items.clone()),
            Value::Object(map) => ExprValue::Object(map.clone()),
        }
    }
}

impl ExprValue {
    fn type_name(&self) -> &'static str {
        match self {
            ExprValue::Undefined => "undefined",
            ExprValue::Null => "null",
            ExprValue::Bool(_) => "boolean",
            ExprValue::Number(_) => "number",
            ExprValue::Str(_) => "string",
            ExprValue::Array(_) | ExprValue::Object(_) => "object",
        }
    }

    /// `false`, `0`, `NaN`, `""`, `null` and `undefined` are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            ExprValue::Undefined | ExprValue::Null => false,
            ExprValue::Bool(b) => *b,
            ExprValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ExprValue::Str(s) => !s.is_empty(),
            ExprValue::Array(_) | ExprValue::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            ExprValue::Undefined => f64::NAN,
            ExprValue::Null => 0.0,
            ExprValue::Bool(b) => f64::from(u8::from(*b)),
            ExprValue::Number(n) => *n,
            ExprValue::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            ExprValue::Array(_) | ExprValue::Object(_) => f64::NAN,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            ExprValue::Undefined => "undefined".to_string(),
            ExprValue::Null => "null".to_string(),
            ExprValue::Bool(b) => b.to_string(),
            ExprValue::Number(n) => format_number(*n),
            ExprValue::Str(s) => s.clone(),
            ExprValue::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    other => ExprValue::from(other).to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            ExprValue::Object(_) => "[object Object]".to_string(),
        }
    }

    fn strict_eq(&self, other: &ExprValue) -> bool {
        match (self, other) {
            (ExprValue::Number(a), ExprValue::Number(b)) => a == b,
            _ => self == other,
        }
    }

    fn loose_eq(&self, other: &ExprValue) -> bool {
        use ExprValue::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Number(_), Str(_)) | (Str(_), Number(_)) | (Bool(_), _) | (_, Bool(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self.strict_eq(other),
        }
    }
}

/// Format a number the way a JavaScript engine prints it
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        ryu_js::Buffer::new().format(n).to_string()
    }
}

/// Evaluate an expression with `datum` bound to `row`
pub fn evaluate(expr: &Expr, row: &Value) -> Result<ExprValue, ExprError> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Literal::Number(n) => ExprValue::Number(*n),
            Literal::Str(s) => ExprValue::Str(s.clone()),
            Literal::Bool(b) => ExprValue::Bool(*b),
            Literal::Null => ExprValue::Null,
            Literal::Undefined => ExprValue::Undefined,
        }),
        Expr::Ident(name) if name == "datum" => Ok(ExprValue::from(row)),
        Expr::Ident(name) => Err(ExprError::eval(format!("{} is not defined", name))),
        Expr::Member(object, field) => {
            let object = evaluate(object, row)?;
            member(&object, field)
        }
        Expr::Index(object, key) => {
            let object = evaluate(object, row)?;
            let key = evaluate(key, row)?;
            index(&object, &key)
        }
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, row)?;
            Ok(match op {
                UnaryOp::Not => ExprValue::Bool(!value.is_truthy()),
                UnaryOp::Neg => ExprValue::Number(-value.to_number()),
                UnaryOp::Plus => ExprValue::Number(value.to_number()),
            })
        }
        Expr::Binary(lhs, BinaryOp::And, rhs) => {
            let left = evaluate(lhs, row)?;
            if left.is_truthy() {
                evaluate(rhs, row)
            } else {
                Ok(left)
            }
        }
        Expr::Binary(lhs, BinaryOp::Or, rhs) => {
            let left = evaluate(lhs, row)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                evaluate(rhs, row)
            }
        }
        Expr::Binary(lhs, op, rhs) => {
            let left = evaluate(lhs, row)?;
            let right = evaluate(rhs, row)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Conditional(test, consequent, alternate) => {
            if evaluate(test, row)?.is_truthy() {
                evaluate(consequent, row)
            } else {
                evaluate(alternate, row)
            }
        }
    }
}

fn member(object: &ExprValue, field: &str) -> Result<ExprValue, ExprError> {
    match object {
        ExprValue::Undefined | ExprValue::Null => Err(ExprError::eval(format!(
            "cannot read property '{}' of {}",
            field,
            object.type_name()
        ))),
        ExprValue::Object(map) => Ok(map.get(field).map_or(ExprValue::Undefined, ExprValue::from)),
        ExprValue::Array(items) if field == "length" => Ok(ExprValue::Number(items.len() as f64)),
        ExprValue::Str(s) if field == "length" => {
            Ok(ExprValue::Number(s.encode_utf16().count() as f64))
        }
        _ => Ok(ExprValue::Undefined),
    }
}

fn index(object: &ExprValue, key: &ExprValue) -> Result<ExprValue, ExprError> {
    match (object, key) {
        (ExprValue::Array(items), ExprValue::Number(n)) => {
            if n.fract() == 0.0 && *n >= 0.0 {
                Ok(items
                    .get(*n as usize)
                    .map_or(ExprValue::Undefined, ExprValue::from))
            } else {
                Ok(ExprValue::Undefined)
            }
        }
        _ => member(object, &key.to_display_string()),
    }
}

fn binary(op: BinaryOp, left: &ExprValue, right: &ExprValue) -> ExprValue {
    match op {
        BinaryOp::Add => match (left, right) {
            (ExprValue::Str(_), _) | (_, ExprValue::Str(_)) => ExprValue::Str(format!(
                "{}{}",
                left.to_display_string(),
                right.to_display_string()
            )),
            _ => ExprValue::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => ExprValue::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => ExprValue::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => ExprValue::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => ExprValue::Number(left.to_number() % right.to_number()),
        BinaryOp::Less => ExprValue::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LessOrEqual => ExprValue::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Greater => ExprValue::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GreaterOrEqual => ExprValue::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => ExprValue::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => ExprValue::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => ExprValue::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => ExprValue::Bool(!left.strict_eq(right)),
        // Short-circuit operators are handled before both sides are evaluated
        BinaryOp::And | BinaryOp::Or => ExprValue::Undefined,
    }
}

/// Relational comparison: strings compare lexically, everything else numerically
fn compare(left: &ExprValue, right: &ExprValue) -> Option<Ordering> {
    match (left, right) {
        (ExprValue::Str(a), ExprValue::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}
