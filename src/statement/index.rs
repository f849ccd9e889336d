//! CREATE INDEX and DROP INDEX

use std::io::{self, Write};
use std::sync::Arc;

use serde_json::Value;

use crate::ast::{accessors, labels, Term};
use crate::compiler::CompileScope;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::result::StatementResult;
use crate::store::ValueExtractor;

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const CREATE_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlCreateIndexNode",
    "(ENSURE|CREATE) INDEX [ON] 'cache-name' extractor-list",
    "Make sure an index exists for the extractor list. Creating an existing\n\
     index is a no-op.",
    realize_create,
);

pub const DROP_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlDropIndexNode",
    "DROP INDEX [ON] 'cache-name' extractor-list",
    "Remove the index for the extractor list.",
    realize_drop,
);

/// Several extractors indexed together as one
#[derive(Debug, Clone)]
pub struct CompositeExtractor {
    parts: Vec<Arc<dyn ValueExtractor>>,
}

impl ValueExtractor for CompositeExtractor {
    fn extract(&self, key: &Value, value: &Value) -> Value {
        Value::Array(self.parts.iter().map(|p| p.extract(key, value)).collect())
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.parts.iter().map(|p| p.describe()).collect();
        format!("[{}]", parts.join(", "))
    }
}

fn compile_index(
    ctx: &ExecutionContext,
    term: &Term,
    binds: &BindVariables,
    kind: &str,
) -> QueryResult<(String, Arc<dyn ValueExtractor>)> {
    let cache = required_cache(term, kind)?;
    let list = accessors::extractor_list(term)
        .ok_or_else(|| QueryError::missing_attribute(kind, labels::EXTRACTOR))?;
    let alias = accessors::alias(term);
    let scope = CompileScope::new(&cache, alias.as_deref(), binds, ctx.dialect());

    let mut parts = ctx.projection_compiler().compile_extractors(list, &scope)?;
    let extractor: Arc<dyn ValueExtractor> = match parts.len() {
        0 => return Err(QueryError::missing_extractor(kind)),
        1 => parts.remove(0),
        _ => Arc::new(CompositeExtractor { parts }),
    };
    Ok((cache, extractor))
}

fn realize_create(
    ctx: &ExecutionContext,
    term: &Term,
    binds: &BindVariables,
) -> QueryResult<Statement> {
    let (cache, extractor) = compile_index(ctx, term, binds, "CREATE INDEX")?;
    Ok(Statement::CreateIndex(IndexStatement { cache, extractor }))
}

fn realize_drop(
    ctx: &ExecutionContext,
    term: &Term,
    binds: &BindVariables,
) -> QueryResult<Statement> {
    let (cache, extractor) = compile_index(ctx, term, binds, "DROP INDEX")?;
    Ok(Statement::DropIndex(IndexStatement { cache, extractor }))
}

/// Target of CREATE INDEX or DROP INDEX
#[derive(Debug, Clone)]
pub struct IndexStatement {
    cache: String,
    extractor: Arc<dyn ValueExtractor>,
}

impl IndexStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn extractor(&self) -> &Arc<dyn ValueExtractor> {
        &self.extractor
    }

    pub(super) fn create(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        collection.add_index(Arc::clone(&self.extractor))?;
        Ok(StatementResult::null())
    }

    pub(super) fn drop_index(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        collection.remove_index(self.extractor.as_ref())?;
        Ok(StatementResult::null())
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext, kind: &str) -> QueryResult<()> {
        ensure_cache(ctx, kind, &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write, operation: &str) -> io::Result<()> {
        writeln!(
            out,
            "session.get_collection({:?}).{}({})",
            self.cache,
            operation,
            self.extractor.describe()
        )
    }
}
