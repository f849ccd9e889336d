//! Statement executor
//!
//! Execution flow per statement (strict order):
//! 1. Realize the term through the registry
//! 2. Sanity check, if enabled
//! 3. Ask for confirmation, unless silent
//! 4. Show the plan, when tracing
//! 5. Execute, under the context timeout unless the statement manages its own
//! 6. Print the result, unless silent. SELECT lists print as a table when
//!    their headers line up with the rows.
//!
//! A timed-out statement is abandoned, not cancelled: its store call keeps
//! running on a blocking thread. Mutations report this in their error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::ast::Term;
use crate::context::ExecutionContext;
use crate::errors::{QueryError, QueryResult};
use crate::observability::{Logger, ObservationScope};
use crate::result::{FormattedStatementResult, StatementResult};

use super::Statement;

/// Runs statement text against an execution context
#[derive(Debug, Default)]
pub struct StatementExecutor {
    runtime: OnceLock<Runtime>,
    skipped_timeouts: AtomicUsize,
}

impl StatementExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements that ran without their timeout because the caller was
    /// inside a current-thread tokio runtime
    pub fn skipped_timeouts(&self) -> usize {
        self.skipped_timeouts.load(Ordering::Relaxed)
    }

    /// Parses `input` with the context parser and runs each statement in
    /// turn. Returns the result of the last statement that ran.
    ///
    /// With stop-on-error the first failure is returned. Otherwise failures
    /// are logged, written to the context output, and execution continues.
    pub fn execute(&self, input: &str, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let terms = ctx.parser().parse(input)?;
        let mut last = StatementResult::null();
        for term in &terms {
            match self.execute_term(term, ctx) {
                Ok(result) => last = result,
                Err(e) => report(ctx, e)?,
            }
        }
        Ok(last)
    }

    /// Runs one statement term
    pub fn execute_term(&self, term: &Term, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let functor = term.functor().unwrap_or("atom");
        let scope = ObservationScope::with_fields("STATEMENT_EXECUTE", &[("functor", functor)]);

        let outcome = prepare(term, ctx).and_then(|prepared| match prepared {
            Some(statement) => self
                .run(&statement, ctx)
                .and_then(|result| publish(ctx, &statement, result)),
            None => Ok(StatementResult::null()),
        });

        match &outcome {
            Ok(_) => scope.complete(),
            Err(e) => scope.fail(e.message()),
        }
        outcome
    }

    /// Async counterpart of `execute`; must be awaited inside a tokio runtime
    pub async fn execute_async(
        &self,
        input: &str,
        ctx: &ExecutionContext,
    ) -> QueryResult<StatementResult> {
        let terms = ctx.parser().parse(input)?;
        let mut last = StatementResult::null();
        for term in &terms {
            let outcome = match prepare(term, ctx) {
                Ok(Some(statement)) => run_async(&statement, ctx)
                    .await
                    .and_then(|result| publish(ctx, &statement, result)),
                Ok(None) => Ok(StatementResult::null()),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(result) => last = result,
                Err(e) => report(ctx, e)?,
            }
        }
        Ok(last)
    }

    fn run(&self, statement: &Statement, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let Some(limit) = ctx.timeout().filter(|_| !statement.is_self_managed_timeout()) else {
            return statement.execute(ctx);
        };

        // Blocking on the caller's runtime would panic. A multi-thread
        // runtime can lend this worker out; a current-thread one cannot.
        if let Ok(handle) = Handle::try_current() {
            if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
                self.skipped_timeouts.fetch_add(1, Ordering::Relaxed);
                Logger::warn(
                    "STATEMENT_TIMEOUT_SKIPPED",
                    &[
                        ("statement", statement.kind()),
                        ("reason", "inside current-thread runtime"),
                        ("timeout_ms", limit.as_millis().to_string().as_str()),
                    ],
                );
                return statement.execute(ctx);
            }
            return tokio::task::block_in_place(|| {
                handle.block_on(with_timeout(statement, ctx, limit))
            });
        }

        let runtime = self.runtime()?;
        runtime.block_on(with_timeout(statement, ctx, limit))
    }

    fn runtime(&self) -> QueryResult<&Runtime> {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| QueryError::io("Error starting statement runtime", e))?;
        Ok(self.runtime.get_or_init(|| runtime))
    }
}

/// Realize, check and confirm. `None` when the user declined.
fn prepare(term: &Term, ctx: &ExecutionContext) -> QueryResult<Option<Statement>> {
    let statement = ctx.registry().realize(ctx, term, ctx.binds())?;

    if ctx.is_sanity_check() {
        statement.sanity_check(ctx)?;
    }

    if !ctx.is_silent() {
        if let Some(prompt) = statement.confirmation_prompt() {
            if !ctx.confirm(&prompt) {
                Logger::info("STATEMENT_DECLINED", &[("statement", statement.kind())]);
                return Ok(None);
            }
        }
    }

    if ctx.is_trace() {
        ctx.with_writer(|out| statement.show_plan(out))?;
    }

    Ok(Some(statement))
}

async fn run_async(statement: &Statement, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
    match ctx.timeout().filter(|_| !statement.is_self_managed_timeout()) {
        Some(limit) => with_timeout(statement, ctx, limit).await,
        None => statement.execute_async(ctx).await,
    }
}

async fn with_timeout(
    statement: &Statement,
    ctx: &ExecutionContext,
    limit: Duration,
) -> QueryResult<StatementResult> {
    match tokio::time::timeout(limit, statement.execute_async(ctx)).await {
        Ok(result) => result,
        Err(_) if statement.is_mutation() => {
            Logger::warn(
                "STATEMENT_TIMEOUT_DETACHED",
                &[
                    ("statement", statement.kind()),
                    ("timeout_ms", limit.as_millis().to_string().as_str()),
                ],
            );
            Err(QueryError::timeout_detached(statement.kind(), limit.as_millis()))
        }
        Err(_) => Err(QueryError::timeout(statement.kind(), limit.as_millis())),
    }
}

fn publish(
    ctx: &ExecutionContext,
    statement: &Statement,
    result: StatementResult,
) -> QueryResult<StatementResult> {
    if ctx.is_silent() {
        return Ok(result);
    }

    let headers = statement.headers();
    if headers.is_empty() {
        ctx.with_writer(|out| result.print(out, None))?;
        return Ok(result);
    }

    let table = FormattedStatementResult::new(result, headers.to_vec());
    match table.rows() {
        Ok(_) => ctx.with_writer(|out| Ok(table.print(out, None)))??,
        Err(e) => {
            Logger::trace(
                "RESULT_TABLE_SKIPPED",
                &[("statement", statement.kind()), ("reason", e.message())],
            );
            ctx.with_writer(|out| table.result().print(out, None))?;
        }
    }
    Ok(table.into_result())
}

/// Returns the error under stop-on-error; otherwise logs it and writes it
/// to the output
fn report(ctx: &ExecutionContext, err: QueryError) -> QueryResult<()> {
    if ctx.is_stop_on_error() {
        return Err(err);
    }
    Logger::error(
        "STATEMENT_ERROR",
        &[("code", err.code().code()), ("message", err.message())],
    );
    ctx.with_writer(|out| writeln!(out, "Error: {}", err))?;
    Ok(())
}
