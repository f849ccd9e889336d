//! Named sub-tree accessors
//!
//! Pure lookups of the attributes statement builders read from a statement
//! term. Empty strings and empty lists are reported as absent.

use serde_json::Value;

use super::term::Term;

/// Attribute labels used by statement terms
pub mod labels {
    pub const FROM: &str = "from";
    pub const ALIAS: &str = "alias";
    pub const WHERE: &str = "whereClause";
    pub const FIELDS: &str = "fieldList";
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
    pub const GROUP_BY: &str = "groupBy";
    pub const SET_LIST: &str = "setList";
    pub const EXTRACTOR: &str = "extractor";
    pub const DISTINCT: &str = "isDistinct";
    pub const FILE: &str = "file";
}

/// Renders an atom as a plain string (strings unquoted)
pub fn atom_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Returns the non-empty string held by `label(atom)`
pub fn string_value(term: &Term, label: &str) -> Option<String> {
    term.find_child(label)
        .and_then(|child| child.child_at(0))
        .and_then(Term::as_atom)
        .and_then(atom_string)
        .filter(|s| !s.is_empty())
}

/// Target collection name
pub fn collection_name(term: &Term) -> Option<String> {
    string_value(term, labels::FROM)
}

/// Optional alias of the target collection
pub fn alias(term: &Term) -> Option<String> {
    string_value(term, labels::ALIAS)
}

/// File name for BACKUP, RESTORE and SOURCE
pub fn file_name(term: &Term) -> Option<String> {
    string_value(term, labels::FILE)
}

/// The condition inside `whereClause(...)`
pub fn where_clause(term: &Term) -> Option<&Term> {
    term.find_child(labels::WHERE).and_then(|w| w.child_at(0))
}

/// The `fieldList` node, if it lists at least one field
pub fn field_list(term: &Term) -> Option<&Term> {
    non_empty_child(term, labels::FIELDS)
}

/// The `groupBy` node, if it lists at least one field
pub fn group_by(term: &Term) -> Option<&Term> {
    non_empty_child(term, labels::GROUP_BY)
}

/// The `setList` node, if it holds at least one assignment
pub fn set_list(term: &Term) -> Option<&Term> {
    non_empty_child(term, labels::SET_LIST)
}

/// The `extractor` node, if it lists at least one extractor
pub fn extractor_list(term: &Term) -> Option<&Term> {
    non_empty_child(term, labels::EXTRACTOR)
}

/// The expression inside `key(...)`
pub fn key_term(term: &Term) -> Option<&Term> {
    term.find_child(labels::KEY).and_then(|k| k.child_at(0))
}

/// The expression inside `value(...)`
pub fn value_term(term: &Term) -> Option<&Term> {
    term.find_child(labels::VALUE).and_then(|v| v.child_at(0))
}

/// DISTINCT flag: `isDistinct()` or `isDistinct(true)`
pub fn is_distinct(term: &Term) -> bool {
    match term.find_child(labels::DISTINCT) {
        None => false,
        Some(flag) => match flag.child_at(0).and_then(Term::as_atom) {
            None => flag.children().is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(_) => false,
        },
    }
}

fn non_empty_child<'a>(term: &'a Term, label: &str) -> Option<&'a Term> {
    term.find_child(label)
        .filter(|child| !child.children().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select() -> Term {
        Term::node(
            "sqlSelectNode",
            vec![
                Term::labeled("isDistinct", true),
                Term::node("fieldList", vec![Term::identifier("age")]),
                Term::labeled("from", "people"),
                Term::labeled("alias", "p"),
                Term::node(
                    "whereClause",
                    vec![Term::node(
                        "binaryOperatorNode",
                        vec![Term::atom(">"), Term::identifier("age"), Term::atom(18)],
                    )],
                ),
                Term::node("groupBy", vec![]),
            ],
        )
    }

    #[test]
    fn test_string_values() {
        let term = select();
        assert_eq!(collection_name(&term).as_deref(), Some("people"));
        assert_eq!(alias(&term).as_deref(), Some("p"));
        assert_eq!(file_name(&term), None);
    }

    #[test]
    fn test_empty_name_is_absent() {
        let term = Term::node("sqlDropCacheNode", vec![Term::labeled("from", "")]);
        assert_eq!(collection_name(&term), None);
    }

    #[test]
    fn test_sub_trees() {
        let term = select();
        assert!(where_clause(&term).unwrap().is("binaryOperatorNode"));
        assert_eq!(field_list(&term).unwrap().children().len(), 1);
        assert!(group_by(&term).is_none());
        assert!(set_list(&term).is_none());
        assert!(is_distinct(&term));
    }

    #[test]
    fn test_distinct_flag_forms() {
        let bare = Term::node("x", vec![Term::node("isDistinct", vec![])]);
        let off = Term::node("x", vec![Term::labeled("isDistinct", "false")]);
        let missing = Term::node("x", vec![]);

        assert!(is_distinct(&bare));
        assert!(!is_distinct(&off));
        assert!(!is_distinct(&missing));
    }
}
