//! CREATE CACHE, DROP CACHE and TRUNCATE CACHE

use std::io::{self, Write};

use crate::ast::Term;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::QueryResult;
use crate::result::StatementResult;

use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

pub const CREATE_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlCreateCacheNode",
    "(ENSURE | CREATE) CACHE 'cache-name'",
    "Make sure the cache exists, creating it if needed.",
    realize_create,
);

pub const DROP_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlDropCacheNode",
    "DROP CACHE 'cache-name'",
    "Remove the cache and all of its entries.",
    realize_drop,
);

pub const TRUNCATE_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlTruncateCacheNode",
    "TRUNCATE CACHE 'cache-name'",
    "Remove every entry from the cache, keeping the cache and its indexes.",
    realize_truncate,
);

fn realize_create(
    _ctx: &ExecutionContext,
    term: &Term,
    _binds: &BindVariables,
) -> QueryResult<Statement> {
    Ok(Statement::CreateCache(CreateCacheStatement {
        cache: required_cache(term, "CREATE CACHE")?,
    }))
}

fn realize_drop(
    _ctx: &ExecutionContext,
    term: &Term,
    _binds: &BindVariables,
) -> QueryResult<Statement> {
    Ok(Statement::DropCache(DropCacheStatement {
        cache: required_cache(term, "DROP CACHE")?,
    }))
}

fn realize_truncate(
    _ctx: &ExecutionContext,
    term: &Term,
    _binds: &BindVariables,
) -> QueryResult<Statement> {
    Ok(Statement::TruncateCache(TruncateCacheStatement {
        cache: required_cache(term, "TRUNCATE CACHE")?,
    }))
}

#[derive(Debug, Clone)]
pub struct CreateCacheStatement {
    cache: String,
}

impl CreateCacheStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        ctx.session().get_collection(&self.cache)?;
        Ok(StatementResult::null())
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "session.get_collection({:?})", self.cache)
    }
}

#[derive(Debug, Clone)]
pub struct DropCacheStatement {
    cache: String,
}

impl DropCacheStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    /// Dropping a cache that no longer exists is a no-op
    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        ctx.session().destroy_collection(&self.cache)?;
        Ok(StatementResult::null())
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "DROP CACHE", &self.cache)
    }

    pub(super) fn confirmation_prompt(&self) -> String {
        format!(
            "Are you sure you want to drop cache '{}'? (y/n)",
            self.cache
        )
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "session.destroy_collection({:?})", self.cache)
    }
}

#[derive(Debug, Clone)]
pub struct TruncateCacheStatement {
    cache: String,
}

impl TruncateCacheStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        if ctx.session().has_collection(&self.cache) {
            ctx.session().get_collection(&self.cache)?.truncate()?;
        }
        Ok(StatementResult::null())
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "TRUNCATE CACHE", &self.cache)
    }

    pub(super) fn confirmation_prompt(&self) -> String {
        format!(
            "Are you sure you want to remove all entries from cache '{}'? (y/n)",
            self.cache
        )
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "session.get_collection({:?}).truncate()", self.cache)
    }
}
