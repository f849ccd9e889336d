//! Statement text to terms
//!
//! Lexing and parsing CohQL text is done outside this crate. Whatever does
//! it plugs in through `StatementParser`. `JsonTermParser` reads
//! statements that were already parsed and serialized as JSON terms, one
//! per line.

use std::fmt;

use crate::ast::Term;
use crate::errors::{QueryError, QueryResult};

/// Turns statement text into statement terms
pub trait StatementParser: Send + Sync + fmt::Debug {
    fn parse(&self, input: &str) -> QueryResult<Vec<Term>>;
}

/// One JSON-encoded term per non-blank line. Lines starting with `#` or
/// `--` are comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTermParser;

impl StatementParser for JsonTermParser {
    fn parse(&self, input: &str) -> QueryResult<Vec<Term>> {
        let mut terms = Vec::new();
        for (index, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("--") {
                continue;
            }
            let term: Term =
                serde_json::from_str(line).map_err(|e| QueryError::parse(index + 1, e))?;
            terms.push(term);
        }
        Ok(terms)
    }
}
