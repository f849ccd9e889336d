//! Default projection compiler

use std::sync::Arc;

use serde_json::Value;

use crate::ast::Term;
use crate::errors::{QueryError, QueryResult};
use crate::store::{AggregateFunction, Assignment, Column, ValueExtractor};

use super::expression::{BinaryOp, ExpressionExtractor};
use super::terms::{
    aggregate_call, compile_expression, functors, identifier_name, is_call, is_star,
    property_path,
};
use super::{CompileScope, ProjectionCompiler, SelectList};

/// Compiles field lists, extractor lists, INSERT keys and values, and
/// UPDATE set-lists over the default expression language
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectListMaker;

impl SelectListMaker {
    fn aggregate_column(
        function: AggregateFunction,
        args: &[Term],
        scope: &CompileScope<'_>,
    ) -> QueryResult<Column> {
        let [arg] = args else {
            return Err(QueryError::unsupported_expression(format!(
                "{} takes exactly one argument",
                function.name()
            )));
        };

        if is_star(arg) {
            if function != AggregateFunction::Count {
                return Err(QueryError::unsupported_expression(format!(
                    "{}(*) is not supported",
                    function.name()
                )));
            }
            return Ok(Column {
                name: "COUNT(*)".to_string(),
                extractor: None,
                function: Some(function),
            });
        }

        let extractor = ExpressionExtractor::new(compile_expression(arg, scope)?);
        Ok(Column {
            name: format!("{}({})", function.name(), extractor.describe()),
            extractor: Some(Arc::new(extractor)),
            function: Some(function),
        })
    }
}

impl ProjectionCompiler for SelectListMaker {
    fn compile_select_list(
        &self,
        fields: &Term,
        scope: &CompileScope<'_>,
    ) -> QueryResult<SelectList> {
        let mut columns = Vec::with_capacity(fields.children().len());
        let mut has_calls = false;

        for field in fields.children() {
            has_calls |= is_call(field);
            let column = match aggregate_call(field) {
                Some((function, args)) => Self::aggregate_column(function, args, scope)?,
                None => {
                    let extractor = ExpressionExtractor::new(compile_expression(field, scope)?);
                    Column {
                        name: extractor.describe(),
                        extractor: Some(Arc::new(extractor)),
                        function: None,
                    }
                }
            };
            columns.push(column);
        }

        Ok(SelectList::new(columns, has_calls))
    }

    fn compile_extractors(
        &self,
        extractors: &Term,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Vec<Arc<dyn ValueExtractor>>> {
        extractors
            .children()
            .iter()
            .map(|term| {
                let expression = compile_expression(term, scope)?;
                Ok(Arc::new(ExpressionExtractor::new(expression)) as Arc<dyn ValueExtractor>)
            })
            .collect()
    }

    fn construct_value(&self, term: &Term, scope: &CompileScope<'_>) -> QueryResult<Value> {
        Ok(compile_expression(term, scope)?.eval(&Value::Null, &Value::Null))
    }

    fn compile_key_expression(
        &self,
        key: &Term,
        value: &Value,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Value> {
        Ok(compile_expression(key, scope)?.eval(&Value::Null, value))
    }

    fn compile_set_list(
        &self,
        set_list: &Term,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Vec<Assignment>> {
        set_list
            .children()
            .iter()
            .map(|item| {
                if !item.is(functors::BINARY) {
                    return Err(QueryError::malformed_set_list(
                        "UPDATE",
                        format!("expected an assignment, found {}", item),
                    ));
                }

                let symbol = item.child_at(0).and_then(Term::as_atom).and_then(Value::as_str);
                if symbol.and_then(BinaryOp::from_symbol) != Some(BinaryOp::Eq) {
                    return Err(QueryError::malformed_set_list(
                        "UPDATE",
                        format!("expected '=' in {}", item),
                    ));
                }

                let target = item
                    .child_at(1)
                    .filter(|t| t.is(functors::IDENTIFIER))
                    .and_then(identifier_name)
                    .ok_or_else(|| {
                        QueryError::malformed_set_list(
                            "UPDATE",
                            format!("assignment target must be a property in {}", item),
                        )
                    })?;

                let source = item.child_at(2).ok_or_else(|| {
                    QueryError::malformed_set_list(
                        "UPDATE",
                        format!("assignment has no value in {}", item),
                    )
                })?;

                Ok(Assignment {
                    path: property_path(&target, scope.alias),
                    expression: Arc::new(ExpressionExtractor::new(compile_expression(
                        source, scope,
                    )?)),
                })
            })
            .collect()
    }
}
