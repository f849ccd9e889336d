//! AST term model
//!
//! A term is either atomic (a literal value) or a compound node with a
//! functor and ordered children. Terms are produced by the parser and are
//! read-only here. The JSON encoding is the one `JsonTermParser` reads:
//!
//! ```text
//! {"functor": "from", "children": ["people"]}
//! ```
//!
//! Any other JSON value is an atom.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compound term payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeTerm {
    pub functor: String,
    #[serde(default)]
    pub children: Vec<Term>,
}

/// A node in the parsed representation of one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    /// Compound term
    Node(NodeTerm),
    /// Literal leaf
    Atom(Value),
}

impl Term {
    /// Creates a compound term
    pub fn node(functor: impl Into<String>, children: Vec<Term>) -> Self {
        Term::Node(NodeTerm {
            functor: functor.into(),
            children,
        })
    }

    /// Creates an atomic term
    pub fn atom(value: impl Into<Value>) -> Self {
        Term::Atom(value.into())
    }

    /// Shorthand for `functor(atom)`
    pub fn labeled(functor: impl Into<String>, value: impl Into<Value>) -> Self {
        Term::node(functor, vec![Term::atom(value)])
    }

    /// Shorthand for `identifier(name)`
    pub fn identifier(name: &str) -> Self {
        Term::labeled("identifier", name)
    }

    /// Returns the functor of a compound term
    pub fn functor(&self) -> Option<&str> {
        match self {
            Term::Node(node) => Some(&node.functor),
            Term::Atom(_) => None,
        }
    }

    /// Returns true if this is a compound term with the given functor
    pub fn is(&self, functor: &str) -> bool {
        self.functor() == Some(functor)
    }

    /// Returns the children (empty for atoms)
    pub fn children(&self) -> &[Term] {
        match self {
            Term::Node(node) => &node.children,
            Term::Atom(_) => &[],
        }
    }

    /// Returns the literal value of an atom
    pub fn as_atom(&self) -> Option<&Value> {
        match self {
            Term::Atom(value) => Some(value),
            Term::Node(_) => None,
        }
    }

    /// Returns true for atoms
    pub fn is_atom(&self) -> bool {
        matches!(self, Term::Atom(_))
    }

    /// Returns the child at `index`
    pub fn child_at(&self, index: usize) -> Option<&Term> {
        self.children().get(index)
    }

    /// Returns the first direct child with the given functor
    pub fn find_child(&self, functor: &str) -> Option<&Term> {
        self.children().iter().find(|child| child.is(functor))
    }

    /// Returns true if `prefix`'s children equal the head of this term's
    /// children, in order. Functors of the two terms are not compared.
    pub fn head_match(&self, prefix: &Term) -> bool {
        let ours = self.children();
        let theirs = prefix.children();
        theirs.len() <= ours.len() && ours.iter().zip(theirs).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(value) => write!(f, "{}", value),
            Term::Node(node) => {
                write!(f, "{}(", node.functor)?;
                for (i, child) in node.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
