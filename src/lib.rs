//! cohql - statement compiler and executor for CohQL
//!
//! Statement terms are compiled into store primitives (filters,
//! aggregators, entry processors) and executed against a partitioned
//! key/value store through the `store::Session` seam.

pub mod ast;
pub mod cli;
pub mod compiler;
pub mod context;
pub mod errors;
pub mod observability;
pub mod result;
pub mod statement;
pub mod store;
