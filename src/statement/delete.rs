//! DELETE

use std::io::{self, Write};
use std::sync::Arc;

use crate::ast::{accessors, Term};
use crate::compiler::CompileScope;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::QueryResult;
use crate::result::{Payload, StatementResult};
use crate::store::{AlwaysFilter, ConditionalRemoveProcessor, EntryProcessor, Filter};

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlDeleteNode",
    "DELETE FROM 'cache-name'[[AS] alias] [WHERE cond]",
    "Remove every entry matching the condition and return the removed entries.",
    realize,
);

fn realize(ctx: &ExecutionContext, term: &Term, binds: &BindVariables) -> QueryResult<Statement> {
    let cache = required_cache(term, "DELETE")?;
    let alias = accessors::alias(term);
    let scope = CompileScope::new(&cache, alias.as_deref(), binds, ctx.dialect());
    let filter = ctx
        .predicate_compiler()
        .compile_predicate(accessors::where_clause(term), &scope)?;

    Ok(Statement::Delete(DeleteStatement { cache, filter }))
}

#[derive(Debug, Clone)]
pub struct DeleteStatement {
    cache: String,
    filter: Arc<dyn Filter>,
}

impl DeleteStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    fn processor() -> ConditionalRemoveProcessor {
        ConditionalRemoveProcessor::new(Arc::new(AlwaysFilter))
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        let removed = collection.invoke_all(self.filter.as_ref(), &Self::processor())?;
        Ok(StatementResult::new(Payload::Keyed(removed), true))
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "DELETE", &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "session.get_collection({:?}).invoke_all({}, {})",
            self.cache,
            self.filter.describe(),
            Self::processor().describe()
        )
    }
}
