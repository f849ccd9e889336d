//! Default predicate compiler

use std::sync::Arc;

use crate::ast::Term;
use crate::errors::QueryResult;
use crate::store::{AllFilter, AlwaysFilter, Filter};

use super::expression::ExpressionFilter;
use super::terms::compile_expression;
use super::{CompileScope, PredicateCompiler};

/// Compiles a WHERE clause into expression filters.
///
/// A top-level `&&` chain becomes an `AllFilter` with one filter per
/// operand, so each conjunct can be matched against an index on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterBuilder;

impl PredicateCompiler for FilterBuilder {
    fn compile_predicate(
        &self,
        condition: Option<&Term>,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Arc<dyn Filter>> {
        let Some(condition) = condition else {
            return Ok(Arc::new(AlwaysFilter));
        };

        let mut filters: Vec<Arc<dyn Filter>> = compile_expression(condition, scope)?
            .conjuncts()
            .into_iter()
            .map(|e| Arc::new(ExpressionFilter::new(e)) as Arc<dyn Filter>)
            .collect();

        if filters.len() == 1 {
            if let Some(only) = filters.pop() {
                return Ok(only);
            }
        }
        Ok(Arc::new(AllFilter::new(filters)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::terms::functors;
    use crate::context::{BindVariables, Dialect};
    use serde_json::json;

    fn compile(condition: Option<&Term>) -> Arc<dyn Filter> {
        let binds = BindVariables::new().with_positional(18);
        let dialect = Dialect::default();
        let scope = CompileScope::new("people", Some("p"), &binds, &dialect);
        FilterBuilder.compile_predicate(condition, &scope).unwrap()
    }

    fn binary(op: &str, l: Term, r: Term) -> Term {
        Term::node(functors::BINARY, vec![Term::atom(op), l, r])
    }

    #[test]
    fn test_no_condition_is_always() {
        let filter = compile(None);
        assert_eq!(filter.describe(), "AlwaysFilter");
        assert!(filter.evaluate(&json!(1), &json!(null)));
    }

    #[test]
    fn test_single_condition() {
        let bind = Term::node(functors::BINDING, vec![Term::atom("?"), Term::atom(1)]);
        let condition = binary(">", Term::identifier("p.age"), bind);
        let filter = compile(Some(&condition));

        assert_eq!(filter.describe(), "age > 18");
        assert!(filter.evaluate(&json!(1), &json!({"age": 30})));
        assert!(!filter.evaluate(&json!(1), &json!({"age": 10})));
        assert_eq!(filter.index_candidate(), Some("age".to_string()));
    }

    #[test]
    fn test_conjunction_is_split() {
        let condition = binary(
            "&&",
            binary(">", Term::identifier("age"), Term::atom(18)),
            binary("==", Term::identifier("city"), Term::atom("Oslo")),
        );
        let filter = compile(Some(&condition));

        assert_eq!(filter.conjuncts().len(), 2);
        assert!(filter.evaluate(&json!(1), &json!({"age": 30, "city": "Oslo"})));
        assert!(!filter.evaluate(&json!(1), &json!({"age": 30, "city": "Rome"})));
    }
}
