//! Statement builders and the registry that maps statement terms to them

use std::fmt::Write as _;

use crate::ast::Term;
use crate::context::{BindVariables, ExecutionContext};
use crate::errors::{QueryError, QueryResult};

use super::{backup, cache, delete, index, insert, recorder, select, source, update, Statement};

/// Compiles one statement term. Never touches the store.
pub type RealizeFn = fn(&ExecutionContext, &Term, &BindVariables) -> QueryResult<Statement>;

/// Builder for one statement kind
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    /// Functor of the statement term this builder accepts
    pub functor: &'static str,
    /// User-facing syntax
    pub syntax: &'static str,
    pub description: &'static str,
    realize: RealizeFn,
}

impl StatementBuilder {
    pub const fn new(
        functor: &'static str,
        syntax: &'static str,
        description: &'static str,
        realize: RealizeFn,
    ) -> Self {
        Self {
            functor,
            syntax,
            description,
            realize,
        }
    }

    /// Validates the term and compiles it into a statement
    pub fn realize(
        &self,
        ctx: &ExecutionContext,
        term: &Term,
        binds: &BindVariables,
    ) -> QueryResult<Statement> {
        (self.realize)(ctx, term, binds)
    }
}

/// Builders keyed by statement functor. Built once and handed to the
/// executor through the execution context.
#[derive(Debug, Clone, Default)]
pub struct StatementRegistry {
    builders: Vec<StatementBuilder>,
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in statement
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for builder in [
            select::BUILDER,
            insert::BUILDER,
            update::BUILDER,
            delete::BUILDER,
            cache::CREATE_BUILDER,
            cache::DROP_BUILDER,
            cache::TRUNCATE_BUILDER,
            index::CREATE_BUILDER,
            index::DROP_BUILDER,
            backup::BACKUP_BUILDER,
            backup::RESTORE_BUILDER,
            source::BUILDER,
            recorder::EXPLAIN_BUILDER,
            recorder::TRACE_BUILDER,
        ] {
            registry.register(builder);
        }
        registry
    }

    /// Adds a builder, replacing any builder for the same functor
    pub fn register(&mut self, builder: StatementBuilder) {
        match self.builders.iter_mut().find(|b| b.functor == builder.functor) {
            Some(existing) => *existing = builder,
            None => self.builders.push(builder),
        }
    }

    pub fn get(&self, functor: &str) -> Option<&StatementBuilder> {
        self.builders.iter().find(|b| b.functor == functor)
    }

    pub fn builders(&self) -> &[StatementBuilder] {
        &self.builders
    }

    /// Finds the builder for the term's functor and realizes the term
    pub fn realize(
        &self,
        ctx: &ExecutionContext,
        term: &Term,
        binds: &BindVariables,
    ) -> QueryResult<Statement> {
        let functor = term
            .functor()
            .ok_or_else(|| QueryError::unknown_statement(&term.to_string()))?;
        let builder = self
            .get(functor)
            .ok_or_else(|| QueryError::unknown_statement(functor))?;
        builder.realize(ctx, term, binds)
    }

    /// Syntax and description of every statement
    pub fn help(&self) -> String {
        let mut out = String::new();
        for builder in &self.builders {
            let _ = writeln!(out, "{}", builder.syntax);
            for line in builder.description.lines() {
                let _ = writeln!(out, "    {}", line);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorCode;
    use crate::store::LocalSession;
    use std::sync::Arc;

    #[test]
    fn test_standard_registry() {
        let registry = StatementRegistry::standard();
        assert_eq!(registry.builders().len(), 14);
        for functor in [
            "sqlSelectNode",
            "sqlInsertNode",
            "sqlUpdateNode",
            "sqlDeleteNode",
            "sqlCreateCacheNode",
            "sqlDropCacheNode",
            "sqlTruncateCacheNode",
            "sqlCreateIndexNode",
            "sqlDropIndexNode",
            "sqlBackupCacheNode",
            "sqlRestoreCacheNode",
            "sqlSourceNode",
            "sqlExplainNode",
            "sqlTraceNode",
        ] {
            assert!(registry.get(functor).is_some(), "{} not registered", functor);
        }
    }

    #[test]
    fn test_help_lists_syntax() {
        let help = StatementRegistry::standard().help();
        assert!(help.contains(
            "SELECT (properties* aggregators* | * | alias) FROM 'cache-name' [[AS] alias] [WHERE cond] [GROUP [BY] properties+]"
        ));
        assert!(help.contains("SOURCE FROM [FILE] 'filename'"));
        assert!(help.contains("BACKUP CACHE 'cache-name' [TO] [FILE] 'filename'"));
    }

    #[test]
    fn test_unknown_functor() {
        let ctx = ExecutionContext::new(Arc::new(LocalSession::default()));
        let registry = StatementRegistry::standard();
        let err = registry
            .realize(&ctx, &Term::node("sqlMergeNode", vec![]), &BindVariables::new())
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlUnknownStatement);

        let err = registry
            .realize(&ctx, &Term::atom("SELECT"), &BindVariables::new())
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::CohqlUnknownStatement);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = StatementRegistry::standard();
        let mut custom = select::BUILDER;
        custom.description = "custom";
        registry.register(custom);
        assert_eq!(registry.builders().len(), 14);
        assert_eq!(registry.get("sqlSelectNode").unwrap().description, "custom");
    }
}
