//! Value helpers shared by filters, aggregators and the compilers
//!
//! Values are JSON documents. Numbers stay integral while both operands
//! are integral and fall back to f64 otherwise.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Canonical string form used for partitioning, grouping and ordering
pub fn canonical(value: &Value) -> String {
    value.to_string()
}

/// Orders two values of the same kind; mixed kinds are unordered
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                return Some(xi.cmp(&yi));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Equality with numeric widening (1 == 1.0)
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Truthiness used when an expression is evaluated as a predicate
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        _ => true,
    }
}

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Applies an arithmetic operator. `+` also concatenates strings.
/// Returns null for non-numeric operands and division by zero.
pub fn arith(op: ArithOp, a: &Value, b: &Value) -> Value {
    if let (ArithOp::Add, Value::String(x), Value::String(y)) = (op, a, b) {
        return Value::String(format!("{}{}", x, y));
    }

    let (Value::Number(x), Value::Number(y)) = (a, b) else {
        return Value::Null;
    };

    if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
        let result = match op {
            ArithOp::Add => xi.checked_add(yi),
            ArithOp::Sub => xi.checked_sub(yi),
            ArithOp::Mul => xi.checked_mul(yi),
            ArithOp::Div if yi != 0 && xi % yi == 0 => Some(xi / yi),
            ArithOp::Div => None,
        };
        if let Some(n) = result {
            return Value::from(n);
        }
    }

    let (Some(xf), Some(yf)) = (x.as_f64(), y.as_f64()) else {
        return Value::Null;
    };
    let result = match op {
        ArithOp::Add => xf + yf,
        ArithOp::Sub => xf - yf,
        ArithOp::Mul => xf * yf,
        ArithOp::Div => {
            if yf == 0.0 {
                return Value::Null;
            }
            xf / yf
        }
    };
    Number::from_f64(result).map(Value::Number).unwrap_or(Value::Null)
}

/// Reads a dotted property path out of a value; missing steps yield null
pub fn get_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, step| current.get(step))
}
