//! SOURCE

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::ast::{accessors, labels, Term};
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::observability::{Logger, ObservationScope};
use crate::result::StatementResult;

use super::builder::StatementBuilder;
use super::executor::StatementExecutor;
use super::Statement;

pub const BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlSourceNode",
    "SOURCE FROM [FILE] 'filename'",
    "Execute the statements in a file, silently. Also written as\n\
     @ 'filename' or . filename",
    realize,
);

fn realize(_ctx: &ExecutionContext, term: &Term, _binds: &BindVariables) -> QueryResult<Statement> {
    let file = accessors::file_name(term)
        .ok_or_else(|| QueryError::missing_attribute("SOURCE", labels::FILE))?;
    Ok(Statement::Source(SourceStatement {
        file: PathBuf::from(file),
    }))
}

#[derive(Debug, Clone)]
pub struct SourceStatement {
    file: PathBuf,
}

impl SourceStatement {
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Runs the file's statements in silent mode without sanity checks.
    /// The previous flags are restored however execution ends.
    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let file = self.file.display().to_string();

        if !self.file.is_file() {
            if ctx.is_stop_on_error() {
                return Err(QueryError::file_not_found(&file));
            }
            Logger::warn("SOURCE_FILE_NOT_FOUND", &[("file", file.as_str())]);
            return Ok(StatementResult::null());
        }

        let scope = ObservationScope::with_fields("SOURCE", &[("file", file.as_str())]);
        let input = match fs::read_to_string(&self.file) {
            Ok(input) => input,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(QueryError::io("Error in SOURCE", e));
            }
        };

        let _guard = ctx.enter_silent();
        match StatementExecutor::new().execute(&input, ctx) {
            Ok(_) => {
                scope.complete();
                Ok(StatementResult::null())
            }
            Err(e) => {
                scope.fail(e.message());
                Err(e)
            }
        }
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "source({})", self.file.display())
    }
}
