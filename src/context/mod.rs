//! Execution context
//!
//! The collaborators and flags every statement builder and statement
//! consumes: store session, compilers, parser, bind variables, dialect,
//! output and configuration.

mod bind;
mod config;
mod dialect;
mod execution;
mod parser;

pub use bind::BindVariables;
pub use config::{ConfigError, QueryConfig};
pub use dialect::Dialect;
pub use execution::{Confirmer, ExecutionContext, FlagGuard, OutputBuffer};
pub use parser::{JsonTermParser, StatementParser};
