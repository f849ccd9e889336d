//! SELECT
//!
//! Chooses the store primitive from the shape of the select list:
//!
//! - `*` or the bare alias: no aggregator, matching entries are returned
//! - plain properties: a reducer (per-entry projection), or a distinct
//!   values aggregator for DISTINCT
//! - any call or operator: a full group aggregator

use std::io::{self, Write};
use std::sync::Arc;

use crate::ast::{accessors, Term};
use crate::compiler::terms::{functors, identifier_name, is_star};
use crate::compiler::CompileScope;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::result::{Payload, StatementResult};
use crate::store::{DistinctValuesAggregator, EntryAggregator, Filter, ReducerAggregator};

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlSelectNode",
    "SELECT (properties* aggregators* | * | alias) FROM 'cache-name' [[AS] alias] [WHERE cond] [GROUP [BY] properties+]",
    "Select entries or projections of entries. Aggregators are COUNT, SUM,\n\
     AVG, MIN and MAX. GROUP BY properties must be listed first in the\n\
     select list, in the same order.",
    realize,
);

/// `SELECT *` or `SELECT alias`
fn is_whole_object(fields: Option<&Term>, alias: Option<&str>) -> bool {
    let Some(fields) = fields else {
        return true;
    };
    match fields.children() {
        [only] => {
            is_star(only)
                || (only.is(functors::IDENTIFIER)
                    && alias.is_some()
                    && identifier_name(only).as_deref() == alias)
        }
        _ => false,
    }
}

fn realize(ctx: &ExecutionContext, term: &Term, binds: &BindVariables) -> QueryResult<Statement> {
    let cache = required_cache(term, "SELECT")?;
    let alias = accessors::alias(term);
    let fields = accessors::field_list(term);
    let group_by = accessors::group_by(term);
    let distinct = accessors::is_distinct(term);

    if let Some(group_by) = group_by {
        let fields = fields.ok_or_else(QueryError::group_by_without_fields)?;
        if !fields.head_match(group_by) {
            return Err(QueryError::group_by_mismatch());
        }
    }

    let scope = CompileScope::new(&cache, alias.as_deref(), binds, ctx.dialect());

    let mut has_calls = false;
    let mut headers = Vec::new();
    let aggregator: Option<Arc<dyn EntryAggregator>> = match fields {
        Some(fields) if !is_whole_object(Some(fields), alias.as_deref()) => {
            let select_list = ctx.projection_compiler().compile_select_list(fields, &scope)?;
            has_calls = select_list.has_computed_expressions();
            headers = select_list.headers();
            if !has_calls {
                let extractors = select_list.extractors();
                if distinct {
                    Some(Arc::new(DistinctValuesAggregator::new(extractors)))
                } else {
                    Some(Arc::new(ReducerAggregator::new(extractors)))
                }
            } else {
                let group_count = group_by.map_or(0, |g| g.children().len());
                Some(Arc::new(select_list.into_aggregator(group_count)))
            }
        }
        _ => None,
    };

    let filter = ctx
        .predicate_compiler()
        .compile_predicate(accessors::where_clause(term), &scope)?;

    let is_reduction = !has_calls && !distinct && aggregator.is_some();

    Ok(Statement::Select(SelectStatement {
        cache,
        filter,
        aggregator,
        is_reduction,
        headers,
    }))
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    cache: String,
    filter: Arc<dyn Filter>,
    aggregator: Option<Arc<dyn EntryAggregator>>,
    is_reduction: bool,
    headers: Vec<String>,
}

impl SelectStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    /// `None` for whole-object selects
    pub fn aggregator(&self) -> Option<&Arc<dyn EntryAggregator>> {
        self.aggregator.as_ref()
    }

    /// Plain per-entry projection; results print without keys
    pub fn is_reduction(&self) -> bool {
        self.is_reduction
    }

    /// Column names of the select list; empty for whole-object selects
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        let payload = match &self.aggregator {
            None => Payload::Keyed(
                collection
                    .entries(self.filter.as_ref())?
                    .into_iter()
                    .map(|e| (e.key, e.value))
                    .collect(),
            ),
            Some(aggregator) => collection.aggregate(self.filter.as_ref(), aggregator.as_ref())?,
        };
        Ok(StatementResult::new(payload, !self.is_reduction))
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "SELECT", &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        match &self.aggregator {
            None => writeln!(
                out,
                "session.get_collection({:?}).entries({})",
                self.cache,
                self.filter.describe()
            ),
            Some(aggregator) => writeln!(
                out,
                "session.get_collection({:?}).aggregate({}, {})",
                self.cache,
                self.filter.describe(),
                aggregator.describe()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorCode;
    use crate::statement::tests::{call, context, from, gt, seed_people};
    use serde_json::json;

    fn select(children: Vec<Term>) -> QueryResult<SelectStatement> {
        let ctx = context();
        match BUILDER.realize(&ctx, &Term::node("sqlSelectNode", children), &BindVariables::new())? {
            Statement::Select(select) => Ok(select),
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    fn fields(items: Vec<Term>) -> Term {
        Term::node("fieldList", items)
    }

    #[test]
    fn test_select_star_has_no_aggregator() {
        let star = select(vec![from("people"), fields(vec![Term::atom("*")])]).unwrap();
        assert!(star.aggregator().is_none());
        assert!(!star.is_reduction());

        let implicit = select(vec![from("people")]).unwrap();
        assert!(implicit.aggregator().is_none());
    }

    #[test]
    fn test_select_alias_has_no_aggregator() {
        let statement = select(vec![
            from("people"),
            Term::labeled("alias", "p"),
            fields(vec![Term::identifier("p")]),
        ])
        .unwrap();
        assert!(statement.aggregator().is_none());
        assert!(!statement.is_reduction());
    }

    #[test]
    fn test_plain_projection_is_reduction() {
        let statement = select(vec![
            from("people"),
            fields(vec![Term::identifier("age")]),
            Term::node("whereClause", vec![gt("age", 18)]),
        ])
        .unwrap();
        assert!(statement.is_reduction());
        assert!(statement
            .aggregator()
            .unwrap()
            .describe()
            .starts_with("ReducerAggregator"));
    }

    #[test]
    fn test_distinct_projection() {
        let statement = select(vec![
            from("people"),
            fields(vec![Term::identifier("city")]),
            Term::node("isDistinct", vec![]),
        ])
        .unwrap();
        assert!(!statement.is_reduction());
        assert!(statement
            .aggregator()
            .unwrap()
            .describe()
            .starts_with("DistinctValuesAggregator"));
    }

    #[test]
    fn test_group_by_prefix() {
        let statement = select(vec![
            from("people"),
            fields(vec![Term::identifier("age"), call("COUNT", vec![Term::atom("*")])]),
            Term::node("groupBy", vec![Term::identifier("age")]),
        ])
        .unwrap();
        assert!(!statement.is_reduction());
        assert!(statement
            .aggregator()
            .unwrap()
            .describe()
            .starts_with("GroupAggregator"));
        assert_eq!(statement.headers(), &["age", "COUNT(*)"]);
    }

    #[test]
    fn test_group_by_mismatch() {
        let err = select(vec![
            from("people"),
            fields(vec![Term::identifier("age"), call("COUNT", vec![Term::atom("*")])]),
            Term::node("groupBy", vec![Term::identifier("name")]),
        ])
        .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlGroupByMismatch);
    }

    #[test]
    fn test_group_by_without_fields() {
        let err = select(vec![
            from("people"),
            Term::node("groupBy", vec![Term::identifier("age")]),
        ])
        .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlGroupByWithoutFields);
    }

    #[test]
    fn test_execute_shapes() {
        let ctx = context();
        seed_people(&ctx);
        let run = |children: Vec<Term>| {
            BUILDER
                .realize(&ctx, &Term::node("sqlSelectNode", children), &BindVariables::new())
                .unwrap()
                .execute(&ctx)
                .unwrap()
        };

        let all = run(vec![from("people")]);
        assert!(all.show_keys());
        assert_eq!(all.payload().len(), 3);

        let ages = run(vec![
            from("people"),
            fields(vec![Term::identifier("age")]),
            Term::node("whereClause", vec![gt("age", 26)]),
        ]);
        assert!(!ages.show_keys());
        assert_eq!(
            ages.payload(),
            &Payload::Keyed(vec![(json!(1), json!(30)), (json!(3), json!(45))])
        );

        let cities = run(vec![
            from("people"),
            fields(vec![Term::identifier("city")]),
            Term::node("isDistinct", vec![]),
        ]);
        assert_eq!(
            cities.payload(),
            &Payload::Collection(vec![json!("Oslo"), json!("Rome")])
        );

        let counts = run(vec![
            from("people"),
            fields(vec![Term::identifier("city"), call("COUNT", vec![Term::atom("*")])]),
            Term::node("groupBy", vec![Term::identifier("city")]),
        ]);
        assert_eq!(
            counts.payload(),
            &Payload::Keyed(vec![(json!("Oslo"), json!(2)), (json!("Rome"), json!(1))])
        );

        let total = run(vec![
            from("people"),
            fields(vec![call("SUM", vec![Term::identifier("age")])]),
        ]);
        assert_eq!(total.payload(), &Payload::Scalar(json!(100)));
    }
}
