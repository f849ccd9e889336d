//! INSERT

use std::io::{self, Write};

use serde_json::Value;

use crate::ast::{accessors, Term};
use crate::compiler::CompileScope;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::result::StatementResult;

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlInsertNode",
    "INSERT INTO 'cache-name' [KEY (...)] VALUE (...)",
    "Insert one entry. Without KEY the value must carry its own key in the\n\
     configured key attribute.",
    realize,
);

/// Resolves the key in order: the KEY expression evaluated against the
/// value, then the value's own key attribute.
fn realize(ctx: &ExecutionContext, term: &Term, binds: &BindVariables) -> QueryResult<Statement> {
    let cache = required_cache(term, "INSERT")?;
    let alias = accessors::alias(term);
    let scope = CompileScope::new(&cache, alias.as_deref(), binds, ctx.dialect());
    let compiler = ctx.projection_compiler();

    let null = Term::atom(Value::Null);
    let value_term = accessors::value_term(term).unwrap_or(&null);
    let value = compiler.construct_value(value_term, &scope)?;

    let key = match accessors::key_term(term) {
        Some(key_term) => compiler.compile_key_expression(key_term, &value, &scope)?,
        None => self_key(&value, &ctx.dialect().key_attribute)?,
    };

    Ok(Statement::Insert(InsertStatement { cache, key, value }))
}

fn self_key(value: &Value, attribute: &str) -> QueryResult<Value> {
    if value.is_null() {
        return Err(QueryError::no_key());
    }
    value
        .get(attribute)
        .filter(|key| !key.is_null())
        .cloned()
        .ok_or_else(|| QueryError::missing_key_accessor(attribute))
}

#[derive(Debug, Clone)]
pub struct InsertStatement {
    cache: String,
    key: Value,
    value: Value,
}

impl InsertStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn key(&self) -> &Value {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the value previously stored under the key, if any
    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let collection = ctx.session().get_collection(&self.cache)?;
        let previous = collection.put(self.key.clone(), self.value.clone())?;
        Ok(StatementResult::scalar(previous.unwrap_or(Value::Null)))
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "INSERT", &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "session.get_collection({:?}).put({}, {})",
            self.cache, self.key, self.value
        )
    }
}
