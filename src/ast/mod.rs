//! Statement AST
//!
//! The parser is external; this module only defines the term shape it
//! produces and the accessors builders use to read it.

pub mod accessors;
mod term;

pub use accessors::labels;
pub use term::{NodeTerm, Term};
