//! Compiled expressions
//!
//! The tree the compilers build from expression terms. Bind variables are
//! already substituted, so evaluation needs nothing but the entry.

use std::cmp::Ordering;

use serde_json::Value;

use crate::store::values::{arith, compare, equals, get_path, is_truthy, ArithOp};
use crate::store::{Filter, ValueExtractor};

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Arith(ArithOp),
}

impl BinaryOp {
    /// Resolves an operator symbol; `=` is accepted for `==`
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "==" | "=" => BinaryOp::Eq,
            "!=" | "<>" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "+" => BinaryOp::Arith(ArithOp::Add),
            "-" => BinaryOp::Arith(ArithOp::Sub),
            "*" => BinaryOp::Arith(ArithOp::Mul),
            "/" => BinaryOp::Arith(ArithOp::Div),
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Arith(op) => op.symbol(),
        }
    }

    /// Comparison operators, the ones an index can serve
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" => Some(UnaryOp::Not),
            "-" => Some(UnaryOp::Neg),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// A compiled expression over one entry
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// Property path into the value; empty means the whole value
    Property(Vec<String>),
    /// The entry key
    Key,
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Unary(UnaryOp, Box<Expression>),
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn property(path: &str) -> Self {
        Expression::Property(path.split('.').map(str::to_string).collect())
    }

    pub fn eval(&self, key: &Value, value: &Value) -> Value {
        match self {
            Expression::Literal(v) => v.clone(),
            Expression::Property(path) => get_path(value, path).cloned().unwrap_or(Value::Null),
            Expression::Key => key.clone(),
            Expression::Unary(op, operand) => {
                let v = operand.eval(key, value);
                match op {
                    UnaryOp::Not => Value::Bool(!is_truthy(&v)),
                    UnaryOp::Neg => arith(ArithOp::Sub, &Value::from(0), &v),
                }
            }
            Expression::Binary(BinaryOp::And, l, r) => {
                Value::Bool(is_truthy(&l.eval(key, value)) && is_truthy(&r.eval(key, value)))
            }
            Expression::Binary(BinaryOp::Or, l, r) => {
                Value::Bool(is_truthy(&l.eval(key, value)) || is_truthy(&r.eval(key, value)))
            }
            Expression::Binary(op, l, r) => {
                let (a, b) = (l.eval(key, value), r.eval(key, value));
                match op {
                    BinaryOp::Eq => Value::Bool(equals(&a, &b)),
                    BinaryOp::Ne => Value::Bool(!equals(&a, &b)),
                    BinaryOp::Lt => Value::Bool(compare(&a, &b) == Some(Ordering::Less)),
                    BinaryOp::Le => Value::Bool(matches!(
                        compare(&a, &b),
                        Some(Ordering::Less | Ordering::Equal)
                    )),
                    BinaryOp::Gt => Value::Bool(compare(&a, &b) == Some(Ordering::Greater)),
                    BinaryOp::Ge => Value::Bool(matches!(
                        compare(&a, &b),
                        Some(Ordering::Greater | Ordering::Equal)
                    )),
                    BinaryOp::Arith(op) => arith(*op, &a, &b),
                    BinaryOp::And | BinaryOp::Or => Value::Null,
                }
            }
        }
    }

    /// Splits a chain of `&&` into its operands
    pub fn conjuncts(self) -> Vec<Expression> {
        match self {
            Expression::Binary(BinaryOp::And, l, r) => {
                let mut parts = l.conjuncts();
                parts.extend(r.conjuncts());
                parts
            }
            other => vec![other],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Expression::Literal(v) => v.to_string(),
            Expression::Property(path) if path.is_empty() => "value()".to_string(),
            Expression::Property(path) => path.join("."),
            Expression::Key => "key()".to_string(),
            Expression::Unary(op, operand) => format!("{}{}", op.symbol(), operand.nested()),
            Expression::Binary(op, l, r) => {
                format!("{} {} {}", l.nested(), op.symbol(), r.nested())
            }
        }
    }

    fn nested(&self) -> String {
        match self {
            Expression::Binary(..) => format!("({})", self.describe()),
            _ => self.describe(),
        }
    }
}

/// Extractor evaluating an expression against each entry
#[derive(Debug, Clone)]
pub struct ExpressionExtractor {
    expression: Expression,
}

impl ExpressionExtractor {
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl ValueExtractor for ExpressionExtractor {
    fn extract(&self, key: &Value, value: &Value) -> Value {
        self.expression.eval(key, value)
    }

    fn describe(&self) -> String {
        self.expression.describe()
    }
}

/// Filter matching entries for which an expression is truthy
#[derive(Debug, Clone)]
pub struct ExpressionFilter {
    expression: Expression,
}

impl ExpressionFilter {
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }
}

impl Filter for ExpressionFilter {
    fn evaluate(&self, key: &Value, value: &Value) -> bool {
        is_truthy(&self.expression.eval(key, value))
    }

    fn describe(&self) -> String {
        self.expression.describe()
    }

    fn index_candidate(&self) -> Option<String> {
        match &self.expression {
            Expression::Binary(op, l, r) if op.is_comparison() => match (l.as_ref(), r.as_ref()) {
                (Expression::Property(path), Expression::Literal(_))
                | (Expression::Literal(_), Expression::Property(path))
                    if !path.is_empty() =>
                {
                    Some(path.join("."))
                }
                _ => None,
            },
            _ => None,
        }
    }
}
