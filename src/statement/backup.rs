//! BACKUP CACHE and RESTORE CACHE
//!
//! Superseded by store-native snapshots but kept for moving small caches
//! between sessions. File handles are owned by the statement call and
//! closed on every exit path.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::ast::{accessors, labels, Term};
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};
use crate::observability::{Logger, ObservationScope};
use crate::result::StatementResult;
use crate::store::AlwaysFilter;

use super::archive::{read_records, write_records};
use super::builder::StatementBuilder;
use super::{ensure_cache, required_cache, Statement};

const PROGRESS_INTERVAL: usize = 1000;

pub const BACKUP_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlBackupCacheNode",
    "BACKUP CACHE 'cache-name' [TO] [FILE] 'filename'",
    "Write every entry of the cache to a file. Deprecated in favor of\n\
     store snapshots.",
    realize_backup,
);

pub const RESTORE_BUILDER: StatementBuilder = StatementBuilder::new(
    "sqlRestoreCacheNode",
    "RESTORE CACHE 'cache-name' [FROM] [FILE] 'filename'",
    "Load the entries of a backup file into the cache, overwriting entries\n\
     with the same key. Deprecated in favor of store snapshots.",
    realize_restore,
);

fn required_file(term: &Term, kind: &str) -> QueryResult<PathBuf> {
    accessors::file_name(term)
        .map(PathBuf::from)
        .ok_or_else(|| QueryError::missing_attribute(kind, labels::FILE))
}

fn realize_backup(
    _ctx: &ExecutionContext,
    term: &Term,
    _binds: &BindVariables,
) -> QueryResult<Statement> {
    Ok(Statement::Backup(BackupStatement {
        cache: required_cache(term, "BACKUP")?,
        file: required_file(term, "BACKUP")?,
    }))
}

fn realize_restore(
    _ctx: &ExecutionContext,
    term: &Term,
    _binds: &BindVariables,
) -> QueryResult<Statement> {
    Ok(Statement::Restore(RestoreStatement {
        cache: required_cache(term, "RESTORE")?,
        file: required_file(term, "RESTORE")?,
    }))
}

#[derive(Debug, Clone)]
pub struct BackupStatement {
    cache: String,
    file: PathBuf,
}

impl BackupStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let file = self.file.display().to_string();
        let scope = ObservationScope::with_fields(
            "BACKUP",
            &[("cache", self.cache.as_str()), ("file", file.as_str())],
        );

        let entries = ctx
            .session()
            .get_collection(&self.cache)?
            .entries(&AlwaysFilter)?;

        let written = File::create(&self.file).and_then(|handle| {
            let mut writer = BufWriter::new(handle);
            write_records(&mut writer, &entries)
        });

        match written {
            Ok(()) => {
                scope.complete_with_fields(&[("records", entries.len().to_string().as_str())]);
                Ok(StatementResult::null())
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(QueryError::io("Error in BACKUP", e))
            }
        }
    }

    pub(super) fn sanity_check(&self, ctx: &ExecutionContext) -> QueryResult<()> {
        ensure_cache(ctx, "BACKUP", &self.cache)
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "session.get_collection({:?}).entries(AlwaysFilter) -> {}",
            self.cache,
            self.file.display()
        )
    }
}

#[derive(Debug, Clone)]
pub struct RestoreStatement {
    cache: String,
    file: PathBuf,
}

impl RestoreStatement {
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Restores the file into the cache, calling `progress` with the
    /// running record count after each record. Returns the record count.
    pub fn restore(
        &self,
        ctx: &ExecutionContext,
        mut progress: impl FnMut(usize),
    ) -> QueryResult<usize> {
        let file = self.file.display().to_string();
        let scope = ObservationScope::with_fields(
            "RESTORE",
            &[("cache", self.cache.as_str()), ("file", file.as_str())],
        );

        let collection = ctx.session().get_collection(&self.cache)?;

        let mut store_error = None;
        let mut restored = 0;
        let outcome = File::open(&self.file).and_then(|handle| {
            let mut reader = BufReader::new(handle);
            read_records(&mut reader, |key, value| {
                if let Err(e) = collection.put(key, value) {
                    let message = e.to_string();
                    store_error = Some(e);
                    return Err(io::Error::new(io::ErrorKind::Other, message));
                }
                restored += 1;
                progress(restored);
                Ok(())
            })
        });

        match outcome {
            Ok(count) => {
                scope.complete_with_fields(&[("records", count.to_string().as_str())]);
                Ok(count)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                match store_error {
                    Some(store_error) => Err(store_error.into()),
                    None => Err(QueryError::io("Error in RESTORE", e)),
                }
            }
        }
    }

    pub(super) fn execute(&self, ctx: &ExecutionContext) -> QueryResult<StatementResult> {
        let trace = ctx.is_trace();
        let cache = self.cache.as_str();
        self.restore(ctx, |count| {
            if trace && count % PROGRESS_INTERVAL == 0 {
                Logger::info(
                    "RESTORE_PROGRESS",
                    &[("cache", cache), ("records", count.to_string().as_str())],
                );
            }
        })?;
        Ok(StatementResult::null())
    }

    pub(super) fn sanity_check(&self) -> QueryResult<()> {
        if self.file.is_file() {
            Ok(())
        } else {
            Err(QueryError::file_missing(
                "RESTORE",
                &self.file.display().to_string(),
            ))
        }
    }

    pub(super) fn confirmation_prompt(&self) -> String {
        format!(
            "Are you sure you want to restore cache '{}' from '{}'? Existing entries with the same keys are overwritten. (y/n)",
            self.cache,
            self.file.display()
        )
    }

    pub(super) fn show_plan(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{} -> session.get_collection({:?}).put(key, value) per record",
            self.file.display(),
            self.cache
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCategory, QueryErrorCode};
    use crate::statement::tests::{context, from, seed_people};
    use serde_json::json;

    fn term(functor: &str, cache: &str, file: &Path) -> Term {
        Term::node(
            functor,
            vec![from(cache), Term::labeled("file", file.display().to_string())],
        )
    }

    #[test]
    fn test_missing_file_name() {
        let ctx = context();
        let term = Term::node("sqlBackupCacheNode", vec![from("people")]);
        let err = BACKUP_BUILDER
            .realize(&ctx, &term, &BindVariables::new())
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlMissingAttribute);
        assert_eq!(err.field(), Some("file"));
    }

    #[test]
    fn test_backup_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.bak");
        let ctx = context();
        seed_people(&ctx);

        let backup = BACKUP_BUILDER
            .realize(&ctx, &term("sqlBackupCacheNode", "people", &path), &BindVariables::new())
            .unwrap();
        backup.execute(&ctx).unwrap();
        assert!(path.is_file());

        let Statement::Restore(restore) = RESTORE_BUILDER
            .realize(&ctx, &term("sqlRestoreCacheNode", "copy", &path), &BindVariables::new())
            .unwrap()
        else {
            panic!("expected RESTORE");
        };

        let mut calls = Vec::new();
        let count = restore.restore(&ctx, |n| calls.push(n)).unwrap();
        assert_eq!(count, 3);
        assert_eq!(calls, vec![1, 2, 3]);

        let copy = ctx.session().get_collection("copy").unwrap();
        assert_eq!(copy.get(&json!(2)).unwrap().unwrap()["name"], json!("Bob"));
    }

    #[test]
    fn test_restore_sanity_check() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context();
        let statement = RESTORE_BUILDER
            .realize(
                &ctx,
                &term("sqlRestoreCacheNode", "people", &dir.path().join("absent.bak")),
                &BindVariables::new(),
            )
            .unwrap();

        let err = statement.sanity_check(&ctx).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Assertion);

        let err = statement.execute(&ctx).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlIo);
        assert!(err.message().contains("RESTORE"));
    }

    #[test]
    fn test_backup_to_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context();
        seed_people(&ctx);
        let statement = BACKUP_BUILDER
            .realize(
                &ctx,
                &term("sqlBackupCacheNode", "people", &dir.path().join("no/such/dir.bak")),
                &BindVariables::new(),
            )
            .unwrap();

        let err = statement.execute(&ctx).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlIo);
        assert_eq!(err.message(), "Error in BACKUP");
    }
}
