//! Value extractors

use std::fmt;

use serde_json::Value;

/// Pulls a value out of an entry. Missing data extracts as null.
///
/// Two extractors with the same description are interchangeable; indexes
/// are keyed by description.
pub trait ValueExtractor: Send + Sync + fmt::Debug {
    fn extract(&self, key: &Value, value: &Value) -> Value;

    fn describe(&self) -> String;
}
