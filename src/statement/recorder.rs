//! EXPLAIN PLAN and TRACE
//!
//! Both wrap a SELECT-shaped statement. Only its cache and predicate are
//! compiled; the select list is ignored and a `QueryRecorder` runs in
//! place of the real aggregator.

use std::io::{self, Write};
use std::sync::Arc;

use crate::ast::{accessors, Term};
use crate::compiler::CompileScope;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::result::StatementResult;
use crate::store::{AlwaysFilter, Filter, QueryRecorder, RecordingMode};

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const EXPLAIN_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlExplainNode",
    "EXPLAIN PLAN FOR select-statement",
    "Report how the WHERE clause of a SELECT would be evaluated: index use\n\
     and an estimate of the entries each step examines.",
    realize_explain,
);

pub const TRACE_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlTraceNode",
    "TRACE select-statement",
    "Evaluate the WHERE clause of a SELECT step by step and report the\n\
     entries in and out of each step with its elapsed time.",
    realize_trace,
);

fn realize_explain(
    ctx: &ExecutionContext,
    term: &Term,
    binds: &BindVariables,
) -> QueryResult<Statement> {
    realize(ctx, term, binds, RecordingMode::Explain).map(Statement::Explain)
}

fn realize_trace(
    ctx: &ExecutionContext,
    term: &Term,
    binds: &BindVariables,
) -> QueryResult<Statement> {
    realize(ctx, term, binds, RecordingMode::Trace).map(Statement::Trace)
}

fn realize(
    ctx: &ExecutionContext,
    term: &Term,
    binds: &BindVariables,
    mode: RecordingMode,
) -> QueryResult<QueryRecorderStatement> {
    let kind = mode.as_str();
    let inner = term
        .child_at(0)
        .filter(|t| !t.is_atom())
        .ok_or_else(|| QueryError::missing_attribute(kind, "statement"))?;

    let cache = required_cache(inner, kind)?;
    let alias = accessors::alias(inner);
    let scope = CompileScope::new(&cache, alias.as_deref(), binds, ctx.dialect());
    let filter = ctx
        .predicate_compiler()
        .compile_predicate(accessors::where_clause(inner), &scope)?;

    Ok(QueryRecorderStatement {
        mode,
        cache,
        filter,
    })
}

#[derive(Debug, Clone)]
pub struct QueryRecorderStatement {
    mode: RecordingMode,
    cache: String,
    filter: Arc<dyn Filter>,
}

impl QueryRecorderStatement {
    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        let recorder = QueryRecorder::new(
            self.mode,
            self.cache.as_str(),
            Arc::clone(&self.filter),
            collection.indexes()?,
        );
        let payload = collection.aggregate(&AlwaysFilter, &recorder)?;
        Ok(StatementResult::new(payload, false))
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, self.mode.as_str(), &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "session.get_collection({:?}).aggregate(AlwaysFilter, QueryRecorder({}, {}))",
            self.cache,
            self.mode,
            self.filter.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorCode;
    use crate::result::Payload;
    use crate::statement::tests::{context, from, gt, seed_people};
    use crate::store::QueryRecord;

    fn select_over_people() -> Term {
        Term::node(
            "sqlSelectNode",
            vec![
                from("people"),
                Term::node("whereClause", vec![gt("age", 26)]),
            ],
        )
    }

    fn record(result: StatementResult) -> QueryRecord {
        match result.into_payload() {
            Payload::Scalar(value) => serde_json::from_value(value).unwrap(),
            other => panic!("expected a scalar report, got {:?}", other),
        }
    }

    #[test]
    fn test_requires_inner_statement() {
        let ctx = context();
        let err = EXPLAIN_BUILDER
            .realize(&ctx, &Term::node("sqlExplainNode", vec![]), &BindVariables::new())
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlMissingAttribute);
        assert_eq!(err.statement(), Some("EXPLAIN"));
        assert_eq!(err.field(), Some("statement"));
    }

    #[test]
    fn test_explain_uses_index_when_present() {
        let ctx = context();
        seed_people(&ctx);
        let statement = EXPLAIN_BUILDER
            .realize(
                &ctx,
                &Term::node("sqlExplainNode", vec![select_over_people()]),
                &BindVariables::new(),
            )
            .unwrap();

        let before = record(statement.execute(&ctx).unwrap());
        assert_eq!(before.mode, "EXPLAIN");
        assert_eq!(before.entries, 3);
        assert_eq!(before.steps[0].index, None);

        let people = ctx.session().get_collection("people").unwrap();
        let index = Term::node(
            "sqlCreateIndexNode",
            vec![
                from("people"),
                Term::node("extractor", vec![Term::identifier("age")]),
            ],
        );
        ctx.registry()
            .realize(&ctx, &index, &BindVariables::new())
            .unwrap()
            .execute(&ctx)
            .unwrap();
        assert_eq!(people.indexes().unwrap(), vec!["age".to_string()]);

        let after = record(statement.execute(&ctx).unwrap());
        assert_eq!(after.steps[0].index.as_deref(), Some("age"));
    }

    #[test]
    fn test_trace_counts_matches() {
        let ctx = context();
        seed_people(&ctx);
        let statement = TRACE_BUILDER
            .realize(
                &ctx,
                &Term::node("sqlTraceNode", vec![select_over_people()]),
                &BindVariables::new(),
            )
            .unwrap();
        assert_eq!(statement.kind(), "TRACE");

        let report = record(statement.execute(&ctx).unwrap());
        assert_eq!(report.steps[0].input, 3);
        assert_eq!(report.matched, Some(2));
    }
}
