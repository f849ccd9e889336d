//! Predicate and projection compilers
//!
//! Statement builders hand expression sub-trees to two collaborators: a
//! predicate compiler for WHERE clauses and a projection compiler for
//! select lists, extractor lists, INSERT keys and values, and UPDATE
//! set-lists. Both sit behind traits so an execution context can swap
//! them; `FilterBuilder` and `SelectListMaker` are the defaults.

mod expression;
mod filter_builder;
mod select_list;
pub(crate) mod terms;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::ast::Term;
use crate::context::{BindVariables, Dialect};
use crate::errors::QueryResult;
use crate::store::{Assignment, Column, Filter, GroupAggregator, ValueExtractor};

pub use expression::{BinaryOp, Expression, ExpressionExtractor, ExpressionFilter, UnaryOp};
pub use filter_builder::FilterBuilder;
pub use select_list::SelectListMaker;

/// What an expression is compiled against
#[derive(Debug, Clone, Copy)]
pub struct CompileScope<'a> {
    /// Target collection
    pub collection: &'a str,
    /// Alias of the target collection, stripped from property paths
    pub alias: Option<&'a str>,
    pub binds: &'a BindVariables,
    pub dialect: &'a Dialect,
}

impl<'a> CompileScope<'a> {
    pub fn new(
        collection: &'a str,
        alias: Option<&'a str>,
        binds: &'a BindVariables,
        dialect: &'a Dialect,
    ) -> Self {
        Self {
            collection,
            alias,
            binds,
            dialect,
        }
    }
}

/// Compiles WHERE clauses
pub trait PredicateCompiler: Send + Sync + fmt::Debug {
    /// Compiles a condition; no condition yields the always-true filter
    fn compile_predicate(
        &self,
        condition: Option<&Term>,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Arc<dyn Filter>>;
}

/// Compiles projections, keys, values and set-lists
pub trait ProjectionCompiler: Send + Sync + fmt::Debug {
    /// Compiles a SELECT field list
    fn compile_select_list(&self, fields: &Term, scope: &CompileScope<'_>)
        -> QueryResult<SelectList>;

    /// Compiles an index extractor list. Only plain expressions are allowed.
    fn compile_extractors(
        &self,
        extractors: &Term,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Vec<Arc<dyn ValueExtractor>>>;

    /// Builds the value an INSERT stores
    fn construct_value(&self, term: &Term, scope: &CompileScope<'_>) -> QueryResult<Value>;

    /// Builds an INSERT key; the expression may read the inserted value
    fn compile_key_expression(
        &self,
        key: &Term,
        value: &Value,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Value>;

    /// Compiles an UPDATE set-list into assignments
    fn compile_set_list(
        &self,
        set_list: &Term,
        scope: &CompileScope<'_>,
    ) -> QueryResult<Vec<Assignment>>;
}

/// A compiled select list
#[derive(Debug, Clone)]
pub struct SelectList {
    columns: Vec<Column>,
    has_calls: bool,
}

impl SelectList {
    pub fn new(columns: Vec<Column>, has_calls: bool) -> Self {
        Self { columns, has_calls }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// True if any selected expression is a call or operator rather than a
    /// bare property reference
    pub fn has_computed_expressions(&self) -> bool {
        self.has_calls
    }

    /// Extractors of the columns, in order
    pub fn extractors(&self) -> Vec<Arc<dyn ValueExtractor>> {
        self.columns
            .iter()
            .filter_map(|c| c.extractor.clone())
            .collect()
    }

    /// Column names, in order
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Full entry aggregator keyed by the first `group_by` columns
    pub fn into_aggregator(self, group_by: usize) -> GroupAggregator {
        GroupAggregator::new(self.columns, group_by)
    }
}
