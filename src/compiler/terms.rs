//! Expression terms to `Expression`

use serde_json::Value;

use crate::ast::accessors::atom_string;
use crate::ast::Term;
use crate::errors::{QueryError, QueryResult};
use crate::store::AggregateFunction;

use super::expression::{BinaryOp, Expression, UnaryOp};
use super::CompileScope;

pub(crate) mod functors {
    pub const LITERAL: &str = "literal";
    pub const IDENTIFIER: &str = "identifier";
    pub const BINDING: &str = "bindingNode";
    pub const BINARY: &str = "binaryOperatorNode";
    pub const UNARY: &str = "unaryOperatorNode";
    pub const CALL: &str = "callNode";
}

/// True for terms that compute a value rather than reference one
pub fn is_call(term: &Term) -> bool {
    term.is(functors::CALL) || term.is(functors::BINARY) || term.is(functors::UNARY)
}

/// True for `*` in either its atom or identifier form
pub fn is_star(term: &Term) -> bool {
    match term {
        Term::Atom(Value::String(s)) => s == "*",
        _ => term.is(functors::IDENTIFIER) && identifier_name(term).as_deref() == Some("*"),
    }
}

/// Name held by an `identifier(...)` term
pub fn identifier_name(term: &Term) -> Option<String> {
    term.child_at(0).and_then(Term::as_atom).and_then(atom_string)
}

/// Splits a dotted name into a property path, dropping a leading alias.
/// The alias alone is the whole value.
pub fn property_path(name: &str, alias: Option<&str>) -> Vec<String> {
    let mut path: Vec<String> = name.split('.').map(str::to_string).collect();
    if let Some(alias) = alias {
        if path.first().map(String::as_str) == Some(alias) {
            path.remove(0);
        }
    }
    path
}

/// `callNode(name, args...)` naming an aggregate function
pub fn aggregate_call(term: &Term) -> Option<(AggregateFunction, &[Term])> {
    if !term.is(functors::CALL) {
        return None;
    }
    let name = call_name(term)?;
    let function = AggregateFunction::from_name(&name)?;
    Some((function, &term.children()[1..]))
}

fn call_name(term: &Term) -> Option<String> {
    term.child_at(0).and_then(Term::as_atom).and_then(atom_string)
}

fn operator(term: &Term) -> QueryResult<String> {
    term.child_at(0)
        .and_then(Term::as_atom)
        .and_then(atom_string)
        .ok_or_else(|| QueryError::unsupported_expression(format!("Missing operator in {}", term)))
}

fn operand(term: &Term, index: usize) -> QueryResult<&Term> {
    term.child_at(index)
        .ok_or_else(|| QueryError::unsupported_expression(format!("Missing operand in {}", term)))
}

fn literal(value: &Value, scope: &CompileScope<'_>) -> QueryResult<Expression> {
    if matches!(value, Value::Array(_) | Value::Object(_)) && !scope.dialect.extended_language {
        return Err(QueryError::unsupported_expression(
            "Object and array literals require the extended language",
        ));
    }
    Ok(Expression::Literal(value.clone()))
}

fn binding(term: &Term, scope: &CompileScope<'_>) -> QueryResult<Expression> {
    let kind = operator(term)?;
    let reference = operand(term, 1)?
        .as_atom()
        .ok_or_else(|| QueryError::unsupported_expression(format!("Malformed binding {}", term)))?;

    let bound = match kind.as_str() {
        "?" => {
            let index = reference
                .as_u64()
                .or_else(|| reference.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| {
                    QueryError::unsupported_expression(format!("Malformed binding {}", term))
                })? as usize;
            scope
                .binds
                .positional(index)
                .ok_or_else(|| QueryError::missing_bind_variable(format!("?{}", index)))?
        }
        ":" => {
            let name = atom_string(reference).ok_or_else(|| {
                QueryError::unsupported_expression(format!("Malformed binding {}", term))
            })?;
            scope
                .binds
                .named(&name)
                .ok_or_else(|| QueryError::missing_bind_variable(format!(":{}", name)))?
        }
        other => {
            return Err(QueryError::unsupported_expression(format!(
                "Unknown binding kind '{}'",
                other
            )))
        }
    };
    Ok(Expression::Literal(bound.clone()))
}

fn call(term: &Term) -> QueryResult<Expression> {
    let name = call_name(term)
        .ok_or_else(|| QueryError::unsupported_expression(format!("Malformed call {}", term)))?;
    let args = &term.children()[1..];

    if AggregateFunction::from_name(&name).is_some() {
        return Err(QueryError::unsupported_expression(format!(
            "Aggregate function {} is only allowed in a select list",
            name.to_ascii_uppercase()
        )));
    }

    match (name.as_str(), args.len()) {
        ("key", 0) => Ok(Expression::Key),
        ("value", 0) => Ok(Expression::Property(Vec::new())),
        _ => Err(QueryError::unsupported_expression(format!(
            "Unknown function {}/{}",
            name,
            args.len()
        ))),
    }
}

/// Compiles an expression term, substituting bind variables
pub fn compile_expression(term: &Term, scope: &CompileScope<'_>) -> QueryResult<Expression> {
    let functor = match term {
        Term::Atom(value) => return literal(value, scope),
        Term::Node(node) => node.functor.as_str(),
    };

    match functor {
        functors::LITERAL => match term.child_at(0) {
            None => Ok(Expression::Literal(Value::Null)),
            Some(Term::Atom(value)) => literal(value, scope),
            Some(other) => Err(QueryError::unsupported_expression(format!(
                "Malformed literal {}",
                other
            ))),
        },
        functors::IDENTIFIER => {
            let name = identifier_name(term).ok_or_else(|| {
                QueryError::unsupported_expression(format!("Malformed identifier {}", term))
            })?;
            if name == "*" {
                return Err(QueryError::unsupported_expression(
                    "'*' is only valid as the whole select list or in COUNT(*)",
                ));
            }
            Ok(Expression::Property(property_path(&name, scope.alias)))
        }
        functors::BINDING => binding(term, scope),
        functors::BINARY => {
            let symbol = operator(term)?;
            let op = BinaryOp::from_symbol(&symbol).ok_or_else(|| {
                QueryError::unsupported_expression(format!("Unknown operator '{}'", symbol))
            })?;
            let left = compile_expression(operand(term, 1)?, scope)?;
            let right = compile_expression(operand(term, 2)?, scope)?;
            Ok(Expression::binary(op, left, right))
        }
        functors::UNARY => {
            let symbol = operator(term)?;
            let op = UnaryOp::from_symbol(&symbol).ok_or_else(|| {
                QueryError::unsupported_expression(format!("Unknown operator '{}'", symbol))
            })?;
            let inner = compile_expression(operand(term, 1)?, scope)?;
            Ok(Expression::Unary(op, Box::new(inner)))
        }
        functors::CALL => call(term),
        other => Err(QueryError::unsupported_expression(format!(
            "Unsupported expression '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BindVariables, Dialect};
    use crate::errors::QueryErrorCode;
    use serde_json::json;

    fn compile(term: &Term, alias: Option<&str>, binds: &BindVariables) -> QueryResult<Expression> {
        let dialect = Dialect::default();
        let scope = CompileScope::new("people", alias, binds, &dialect);
        compile_expression(term, &scope)
    }

    fn binary(op: &str, l: Term, r: Term) -> Term {
        Term::node(functors::BINARY, vec![Term::atom(op), l, r])
    }

    #[test]
    fn test_alias_is_stripped() {
        let binds = BindVariables::new();
        assert_eq!(
            compile(&Term::identifier("p.age"), Some("p"), &binds).unwrap(),
            Expression::property("age")
        );
        assert_eq!(
            compile(&Term::identifier("p"), Some("p"), &binds).unwrap(),
            Expression::Property(vec![])
        );
        assert_eq!(
            compile(&Term::identifier("p.age"), None, &binds).unwrap(),
            Expression::property("p.age")
        );
    }

    #[test]
    fn test_bindings_substituted() {
        let binds = BindVariables::new().with_positional(18).with_named("city", "Oslo");
        let positional = Term::node(functors::BINDING, vec![Term::atom("?"), Term::atom(1)]);
        let named = Term::node(functors::BINDING, vec![Term::atom(":"), Term::atom("city")]);

        assert_eq!(
            compile(&positional, None, &binds).unwrap(),
            Expression::Literal(json!(18))
        );
        assert_eq!(
            compile(&named, None, &binds).unwrap(),
            Expression::Literal(json!("Oslo"))
        );

        let missing = Term::node(functors::BINDING, vec![Term::atom("?"), Term::atom(2)]);
        assert_eq!(
            compile(&missing, None, &binds).unwrap_err().code(),
            QueryErrorCode::CohqlMissingBindVariable
        );
    }

    #[test]
    fn test_operators() {
        let binds = BindVariables::new();
        let term = binary("=", Term::identifier("age"), Term::atom(3));
        assert_eq!(
            compile(&term, None, &binds).unwrap(),
            Expression::binary(
                BinaryOp::Eq,
                Expression::property("age"),
                Expression::Literal(json!(3))
            )
        );

        let bad = binary("**", Term::identifier("age"), Term::atom(3));
        assert_eq!(
            compile(&bad, None, &binds).unwrap_err().code(),
            QueryErrorCode::CohqlUnsupportedExpression
        );
    }

    #[test]
    fn test_calls() {
        let binds = BindVariables::new();
        let key = Term::node(functors::CALL, vec![Term::atom("key")]);
        assert_eq!(compile(&key, None, &binds).unwrap(), Expression::Key);

        let count = Term::node(functors::CALL, vec![Term::atom("count"), Term::atom("*")]);
        assert!(compile(&count, None, &binds).is_err());
        assert!(aggregate_call(&count).is_some());
        assert!(is_call(&count));
        assert!(!is_call(&Term::identifier("age")));
    }

    #[test]
    fn test_extended_literals() {
        let binds = BindVariables::new();
        let object = Term::atom(json!({"name": "Ann"}));
        assert!(compile(&object, None, &binds).is_ok());

        let dialect = Dialect {
            extended_language: false,
            ..Dialect::default()
        };
        let scope = CompileScope::new("people", None, &binds, &dialect);
        assert!(compile_expression(&object, &scope).is_err());
        assert!(compile_expression(&Term::atom(5), &scope).is_ok());
    }

    #[test]
    fn test_star() {
        assert!(is_star(&Term::atom("*")));
        assert!(is_star(&Term::identifier("*")));
        assert!(!is_star(&Term::identifier("age")));
        assert!(compile(&Term::identifier("*"), None, &BindVariables::new()).is_err());
    }
}
