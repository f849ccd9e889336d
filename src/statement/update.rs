//! UPDATE

use std::io::{self, Write};
use std::sync::Arc;

use crate::ast::{accessors, labels, Term};
use crate::compiler::CompileScope;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::result::{Payload, StatementResult};
use crate::store::{EntryProcessor, Filter, UpdaterProcessor};

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlUpdateNode",
    "UPDATE 'cache-name' [[AS] alias] SET a=v{,a=v}* [WHERE cond]",
    "Apply the assignments to every entry matching the condition and return\n\
     the updated entries.",
    realize,
);

fn realize(ctx: &ExecutionContext, term: &Term, binds: &BindVariables) -> QueryResult<Statement> {
    let cache = required_cache(term, "UPDATE")?;
    let set_list = accessors::set_list(term)
        .ok_or_else(|| QueryError::missing_attribute("UPDATE", labels::SET_LIST))?;
    let alias = accessors::alias(term);
    let scope = CompileScope::new(&cache, alias.as_deref(), binds, ctx.dialect());

    let assignments = ctx.projection_compiler().compile_set_list(set_list, &scope)?;
    if assignments.is_empty() {
        return Err(QueryError::malformed_set_list("UPDATE", "no assignments"));
    }
    let filter = ctx
        .predicate_compiler()
        .compile_predicate(accessors::where_clause(term), &scope)?;

    Ok(Statement::Update(UpdateStatement {
        cache,
        filter,
        processor: Arc::new(UpdaterProcessor::new(assignments)),
    }))
}

#[derive(Debug, Clone)]
pub struct UpdateStatement {
    cache: String,
    filter: Arc<dyn Filter>,
    processor: Arc<UpdaterProcessor>,
}

impl UpdateStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        let updated = collection.invoke_all(self.filter.as_ref(), self.processor.as_ref())?;
        Ok(StatementResult::new(Payload::Keyed(updated), true))
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "UPDATE", &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "session.get_collection({:?}).invoke_all({}, {})",
            self.cache,
            self.filter.describe(),
            self.processor.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::terms::functors;
    use crate::errors::QueryErrorCode;
    use crate::statement::tests::{context, from, seed_people};
    use serde_json::json;

    fn assign(path: &str, value: Term) -> Term {
        Term::node(
            functors::BINARY,
            vec![Term::atom("="), Term::identifier(path), value],
        )
    }

    #[test]
    fn test_missing_set_list() {
        let ctx = context();
        let term = Term::node("sqlUpdateNode", vec![from("people")]);
        let err = BUILDER.realize(&ctx, &term, &BindVariables::new()).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlMissingAttribute);
        assert_eq!(err.field(), Some("setList"));

        let term = Term::node(
            "sqlUpdateNode",
            vec![from("people"), Term::node("setList", vec![])],
        );
        let err = BUILDER.realize(&ctx, &term, &BindVariables::new()).unwrap_err();
        assert_eq!(err.field(), Some("setList"));
    }

    #[test]
    fn test_update_matching_entries() {
        let ctx = context();
        seed_people(&ctx);
        let term = Term::node(
            "sqlUpdateNode",
            vec![
                from("people"),
                Term::labeled("alias", "p"),
                Term::node("setList", vec![assign("p.city", Term::atom("Bergen"))]),
                Term::node(
                    "whereClause",
                    vec![Term::node(
                        functors::BINARY,
                        vec![Term::atom("=="), Term::identifier("p.city"), Term::atom("Oslo")],
                    )],
                ),
            ],
        );
        let statement = BUILDER.realize(&ctx, &term, &BindVariables::new()).unwrap();
        let result = statement.execute(&ctx).unwrap();

        assert!(result.show_keys());
        let Payload::Keyed(updated) = result.payload() else {
            panic!("expected keyed payload");
        };
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|(_, v)| v["city"] == json!("Bergen")));

        let people = ctx.session().get_collection("people").unwrap();
        assert_eq!(people.get(&json!(3)).unwrap().unwrap()["city"], json!("Rome"));
    }
}
