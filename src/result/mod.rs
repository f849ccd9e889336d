//! Statement results
//!
//! `StatementResult` wraps whatever a statement produced together with the
//! show-keys flag; `FormattedStatementResult` adds headers and prints a
//! column-aligned table.

mod formatted;
mod statement_result;

pub use formatted::FormattedStatementResult;
pub use statement_result::{format_value, Payload, StatementResult};
