//! Statements
//!
//! Each statement family lives in its own module with the builder that
//! compiles its term. Compiled statements form the closed `Statement`
//! enum the executor dispatches on. Compilation never touches the store;
//! execution is the only step that does.

mod archive;
mod backup;
mod builder;
mod cache;
mod delete;
mod executor;
mod index;
mod insert;
mod recorder;
mod select;
mod source;
mod update;

pub use backup::{BackupStatement, RestoreStatement};
pub use builder::{RealizeFn, StatementBuilder, StatementRegistry};
pub use cache::{CreateCacheStatement, DropCacheStatement, TruncateCacheStatement};
pub use delete::DeleteStatement;
pub use executor::StatementExecutor;
pub use index::{CompositeExtractor, IndexStatement};
pub use insert::InsertStatement;
pub use recorder::QueryRecorderStatement;
pub use select::SelectStatement;
pub use source::SourceStatement;
pub use update::UpdateStatement;

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;

use crate::ast::{accessors, Term};
use crate::context::ExecutionContext;
use crate::errors::{QueryError, QueryResult};
use crate::result::StatementResult;

/// Future returned by `Statement::execute_async`
pub type StatementFuture = Pin<Box<dyn Future<Output = QueryResult<StatementResult>> + Send>>;

/// A compiled statement
#[derive(Debug, Clone)]
pub enum Statement {
    CreateCache(CreateCacheStatement),
    DropCache(DropCacheStatement),
    TruncateCache(TruncateCacheStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
    CreateIndex(IndexStatement),
    DropIndex(IndexStatement),
    Backup(BackupStatement),
    Restore(RestoreStatement),
    Source(SourceStatement),
    Explain(QueryRecorderStatement),
    Trace(QueryRecorderStatement),
}

impl Statement {
    /// Statement keyword used in errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateCache(_) => "CREATE CACHE",
            Statement::DropCache(_) => "DROP CACHE",
            Statement::TruncateCache(_) => "TRUNCATE CACHE",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Select(_) => "SELECT",
            Statement::CreateIndex(_) => "CREATE INDEX",
            Statement::DropIndex(_) => "DROP INDEX",
            Statement::Backup(_) => "BACKUP",
            Statement::Restore(_) => "RESTORE",
            Statement::Source(_) => "SOURCE",
            Statement::Explain(_) => "EXPLAIN",
            Statement::Trace(_) => "TRACE",
        }
    }

    /// Runs the statement against the context's session, blocking the
    /// caller until the store returns
    pub fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        match self {
            Statement::CreateCache(s) => s.execute(ctx),
            Statement::DropCache(s) => s.execute(ctx),
            Statement::TruncateCache(s) => s.execute(ctx),
            Statement::Insert(s) => s.execute(ctx),
            Statement::Update(s) => s.execute(ctx),
            Statement::Delete(s) => s.execute(ctx),
            Statement::Select(s) => s.execute(ctx),
            Statement::CreateIndex(s) => s.create(ctx),
            Statement::DropIndex(s) => s.drop_index(ctx),
            Statement::Backup(s) => s.execute(ctx),
            Statement::Restore(s) => s.execute(ctx),
            Statement::Source(s) => s.execute(ctx),
            Statement::Explain(s) | Statement::Trace(s) => s.execute(ctx),
        }
    }

    /// Asynchronous execution.
    ///
    /// The store call runs on a tokio blocking thread, so the returned
    /// future must be awaited inside a runtime and can be abandoned by a
    /// timeout. SOURCE runs inline: its nested statements take their own
    /// timeouts.
    pub fn execute_async(&self, ctx: &ExecutionContext) -> StatementFuture {
        let statement = self.clone();
        let ctx = ctx.clone();
        match self {
            Statement::Source(_) => Box::pin(async move { statement.execute(&ctx) }),
            _ => Box::pin(async move {
                let kind = statement.kind();
                tokio::task::spawn_blocking(move || statement.execute(&ctx))
                    .await
                    .map_err(|e| QueryError::runtime(format!("{} task failed: {}", kind, e)))?
            }),
        }
    }

    /// True when executing changes the store
    pub fn is_mutation(&self) -> bool {
        match self {
            Statement::CreateCache(_)
            | Statement::DropCache(_)
            | Statement::TruncateCache(_)
            | Statement::Insert(_)
            | Statement::Update(_)
            | Statement::Delete(_)
            | Statement::CreateIndex(_)
            | Statement::DropIndex(_)
            | Statement::Restore(_)
            | Statement::Source(_) => true,
            Statement::Select(_)
            | Statement::Backup(_)
            | Statement::Explain(_)
            | Statement::Trace(_) => false,
        }
    }

    /// Verifies what the statement refers to exists. A no-op for CREATE
    /// CACHE and SOURCE.
    pub fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        match self {
            Statement::CreateCache(_) | Statement::Source(_) => Ok(()),
            Statement::DropCache(s) => s.sanity_check(ctx),
            Statement::TruncateCache(s) => s.sanity_check(ctx),
            Statement::Insert(s) => s.sanity_check(ctx),
            Statement::Update(s) => s.sanity_check(ctx),
            Statement::Delete(s) => s.sanity_check(ctx),
            Statement::Select(s) => s.sanity_check(ctx),
            Statement::CreateIndex(s) => s.sanity_check(ctx, "CREATE INDEX"),
            Statement::DropIndex(s) => s.sanity_check(ctx, "DROP INDEX"),
            Statement::Backup(s) => s.sanity_check(ctx),
            Statement::Restore(s) => s.sanity_check(),
            Statement::Explain(s) | Statement::Trace(s) => s.sanity_check(ctx),
        }
    }

    /// Writes the store calls the statement will make. Diagnostic only.
    pub fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        match self {
            Statement::CreateCache(s) => s.show_plan(out),
            Statement::DropCache(s) => s.show_plan(out),
            Statement::TruncateCache(s) => s.show_plan(out),
            Statement::Insert(s) => s.show_plan(out),
            Statement::Update(s) => s.show_plan(out),
            Statement::Delete(s) => s.show_plan(out),
            Statement::Select(s) => s.show_plan(out),
            Statement::CreateIndex(s) => s.show_plan(out, "add_index"),
            Statement::DropIndex(s) => s.show_plan(out, "remove_index"),
            Statement::Backup(s) => s.show_plan(out),
            Statement::Restore(s) => s.show_plan(out),
            Statement::Source(s) => s.show_plan(out),
            Statement::Explain(s) | Statement::Trace(s) => s.show_plan(out),
        }
    }

    /// Question to ask before running a destructive statement
    pub fn confirmation_prompt(&self) -> Option<String> {
        match self {
            Statement::DropCache(s) => Some(s.confirmation_prompt()),
            Statement::TruncateCache(s) => Some(s.confirmation_prompt()),
            Statement::Restore(s) => Some(s.confirmation_prompt()),
            _ => None,
        }
    }

    /// SOURCE runs many statements; the executor must not put one timeout
    /// around all of them.
    pub fn is_self_managed_timeout(&self) -> bool {
        matches!(self, Statement::Source(_))
    }

    /// Column headers of a SELECT list, for tabular output
    pub fn headers(&self) -> &[String] {
        match self {
            Statement::Select(s) => s.headers(),
            _ => &[],
        }
    }
}

pub(crate) fn required_cache(term: &Term, kind: &str) -> QueryResult<String> {
    accessors::collection_name(term).ok_or_else(|| QueryError::missing_attribute(kind, "from"))
}

pub(crate) fn ensure_cache(ctx: &ExecutionContext, kind: &str, name: &str) -> QueryResult<()> {
    if ctx.session().has_collection(name) {
        Ok(())
    } else {
        Err(QueryError::collection_not_found(kind, name))
    }
}
